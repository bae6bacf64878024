//! Compact string keys for TileMap entries.
//!
//! ```text
//! entry       := prefix subclass body
//! prefix      := 'x' (het) | '_' (hom)
//! subclass    := '.' (primary) | '*' (alt)
//! body        := allele_part (':' allele_part)*
//! allele_part := group (',' group)*
//! group       := hex(variant_id) ['+' hex(span)]
//! ```
//!
//! Hex is lowercase without padding or prefix. The `+span` term is written only
//! when the span is greater than one. A full TileMap is the `;`-joined list of
//! its entry keys in position order.

use std::fmt::Write;

use thiserror::Error;

use crate::core::tile_map::{TileMap, TileMapEntry, VariantGroup, DEFAULT_PLOIDY};
use crate::core::types::{Subclass, Zygosity, ZygosityClass};

const ALLELE_SEPARATOR: char = ':';
const GROUP_SEPARATOR: char = ',';
const SPAN_SEPARATOR: char = '+';
const ENTRY_SEPARATOR: &str = ";";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Malformed tile map key{}: '{key}': {reason}", segment_label(.segment))]
    MalformedKey {
        /// Index of the offending entry when decoding a whole table
        segment: Option<usize>,
        key: String,
        reason: String,
    },
}

fn segment_label(segment: &Option<usize>) -> String {
    match segment {
        Some(idx) => format!(" (segment {idx})"),
        None => String::new(),
    }
}

impl KeyError {
    fn malformed(key: &str, reason: impl Into<String>) -> Self {
        Self::MalformedKey {
            segment: None,
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    fn at_segment(self, idx: usize) -> Self {
        match self {
            Self::MalformedKey { key, reason, .. } => Self::MalformedKey {
                segment: Some(idx),
                key,
                reason,
            },
        }
    }
}

/// Encode one entry to its compact key
#[must_use]
pub fn encode_entry(entry: &TileMapEntry) -> String {
    let mut key = String::with_capacity(4 + 4 * entry.alleles.iter().map(Vec::len).sum::<usize>());
    key.push(entry.class.zygosity.prefix());
    key.push(entry.class.subclass.marker());

    for (a, groups) in entry.alleles.iter().enumerate() {
        if a > 0 {
            key.push(ALLELE_SEPARATOR);
        }
        for (g, group) in groups.iter().enumerate() {
            if g > 0 {
                key.push(GROUP_SEPARATOR);
            }
            // Writing to a String cannot fail
            let _ = write!(key, "{:x}", group.variant_id);
            if group.span != 1 {
                let _ = write!(key, "{SPAN_SEPARATOR}{:x}", group.span);
            }
        }
    }

    key
}

/// Decode one compact key.
///
/// An explicit `+1` span is accepted even though the encoder never emits it.
///
/// # Errors
///
/// Returns `KeyError::MalformedKey` if the prefix or subclass is missing, the
/// number of allele parts is not [`DEFAULT_PLOIDY`], an allele part or group is
/// empty, a number is not lowercase hex, or a span is zero.
pub fn decode_entry(key: &str) -> Result<TileMapEntry, KeyError> {
    let mut chars = key.chars();

    let zygosity = chars
        .next()
        .and_then(Zygosity::from_prefix)
        .ok_or_else(|| KeyError::malformed(key, "missing zygosity prefix ('x' or '_')"))?;
    let subclass = chars
        .next()
        .and_then(Subclass::from_marker)
        .ok_or_else(|| KeyError::malformed(key, "missing subclass marker ('.' or '*')"))?;

    let body = chars.as_str();
    if body.is_empty() {
        return Err(KeyError::malformed(key, "no allele parts"));
    }

    let mut alleles = Vec::new();
    for (a, part) in body.split(ALLELE_SEPARATOR).enumerate() {
        if part.is_empty() {
            return Err(KeyError::malformed(key, format!("allele part {a} is empty")));
        }
        let mut groups = Vec::new();
        for group in part.split(GROUP_SEPARATOR) {
            groups.push(decode_group(key, group)?);
        }
        alleles.push(groups);
    }
    if alleles.len() != DEFAULT_PLOIDY {
        return Err(KeyError::malformed(
            key,
            format!(
                "expected {DEFAULT_PLOIDY} allele parts, found {}",
                alleles.len()
            ),
        ));
    }

    Ok(TileMapEntry::new(
        ZygosityClass::new(zygosity, subclass),
        alleles,
    ))
}

fn decode_group(key: &str, group: &str) -> Result<VariantGroup, KeyError> {
    let (id, span) = match group.split_once(SPAN_SEPARATOR) {
        Some((id, span)) => (id, Some(span)),
        None => (group, None),
    };

    let variant_id = parse_hex(key, id)?;
    let span = match span {
        Some(s) => parse_hex(key, s)?,
        None => 1,
    };
    if span == 0 {
        return Err(KeyError::malformed(key, format!("zero span in group '{group}'")));
    }

    Ok(VariantGroup::new(variant_id, span))
}

fn parse_hex(key: &str, digits: &str) -> Result<u64, KeyError> {
    if digits.is_empty() {
        return Err(KeyError::malformed(key, "empty hex field"));
    }
    if !digits.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(KeyError::malformed(
            key,
            format!("'{digits}' is not lowercase hex"),
        ));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| KeyError::malformed(key, format!("'{digits}': {e}")))
}

/// Encode a TileMap as `;`-joined keys in position order
#[must_use]
pub fn encode_table(tile_map: &TileMap) -> String {
    let keys: Vec<String> = tile_map.iter().map(encode_entry).collect();
    keys.join(ENTRY_SEPARATOR)
}

/// Decode a `;`-joined table, preserving position order.
///
/// The empty string decodes to an empty TileMap.
///
/// # Errors
///
/// Returns `KeyError::MalformedKey` naming the index of the first segment
/// that fails to decode.
pub fn decode_table(encoded: &str) -> Result<TileMap, KeyError> {
    if encoded.is_empty() {
        return Ok(TileMap::default());
    }

    let entries = encoded
        .split(ENTRY_SEPARATOR)
        .enumerate()
        .map(|(idx, segment)| decode_entry(segment).map_err(|e| e.at_segment(idx)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TileMap::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(class: ZygosityClass, alleles: &[&[(u64, u64)]]) -> TileMapEntry {
        TileMapEntry::new(
            class,
            alleles
                .iter()
                .map(|groups| {
                    groups
                        .iter()
                        .map(|&(id, span)| VariantGroup::new(id, span))
                        .collect()
                })
                .collect(),
        )
    }

    #[test]
    fn test_encode_literals() {
        let het = entry(
            ZygosityClass::HET,
            &[&[(0, 1), (1, 1), (2, 1), (3, 15), (4, 1)], &[(1, 19)]],
        );
        assert_eq!(encode_entry(&het), "x.0,1,2,3+f,4:1+13");

        let het_alt = entry(ZygosityClass::HET_ALT, &[&[(3, 2)], &[(15, 1), (1, 1)]]);
        assert_eq!(encode_entry(&het_alt), "x*3+2:f,1");

        let hom = entry(ZygosityClass::HOM, &[&[(0, 1)], &[(0, 1)]]);
        assert_eq!(encode_entry(&hom), "_.0:0");

        let hom_alt = entry(ZygosityClass::HOM_ALT, &[&[(15, 10)], &[(15, 10)]]);
        assert_eq!(encode_entry(&hom_alt), "_*f+a:f+a");
    }

    #[test]
    fn test_decode_literals() {
        let decoded = decode_entry("x.0,1,2,3+f,4:1+13").unwrap();
        assert_eq!(decoded.class, ZygosityClass::HET);
        assert_eq!(decoded.alleles[0][3], VariantGroup::new(3, 15));
        assert_eq!(decoded.alleles[1], vec![VariantGroup::new(1, 19)]);

        let decoded = decode_entry("_*f+a:f+a").unwrap();
        assert_eq!(decoded.class, ZygosityClass::HOM_ALT);
        assert_eq!(decoded.alleles, vec![vec![VariantGroup::new(15, 10)]; 2]);
    }

    #[test]
    fn test_decode_explicit_unit_span() {
        let decoded = decode_entry("_.0+1:0").unwrap();
        assert_eq!(decoded, TileMapEntry::reference());
    }

    #[test]
    fn test_decode_malformed() {
        for key in [
            "",
            "x",
            "q.0:0",
            "x?0:0",
            "x.",
            "x.0:",
            ":0",
            "x.0::0",
            "x.0,,1:0",
            "x.0+:0",
            "x.0+0:0",
            "x.g:0",
            "x.A:0",
            "x.+5:0",
            "x.0+1+2:0",
            "x.fffffffffffffffff:0",
            "x.0",
            "_.0",
            "_*f+a",
            "x.0:1:2",
        ] {
            assert!(
                matches!(decode_entry(key), Err(KeyError::MalformedKey { .. })),
                "'{key}' should be rejected"
            );
        }
    }

    #[test]
    fn test_table_round_trip() {
        let table = TileMap::new(vec![
            TileMapEntry::reference(),
            entry(ZygosityClass::HOM_ALT, &[&[(0, 1)], &[(0, 1)]]),
            entry(ZygosityClass::HET, &[&[(1, 1)], &[(0, 1)]]),
            entry(ZygosityClass::HET, &[&[(0, 1)], &[(1, 1)]]),
            entry(ZygosityClass::HET, &[&[(2, 1), (5, 1)], &[(3, 2)]]),
            entry(ZygosityClass::HET_ALT, &[&[(0x23, 1)], &[(0x80, 1)]]),
        ]);

        let encoded = encode_table(&table);
        assert_eq!(encoded, "_.0:0;_*0:0;x.1:0;x.0:1;x.2,5:3+2;x*23:80");
        assert_eq!(decode_table(&encoded).unwrap(), table);
    }

    #[test]
    fn test_decode_reports_allele_count() {
        let err = decode_entry("x.0:1:2").unwrap_err();
        assert!(err.to_string().contains("expected 2 allele parts, found 3"));

        let err = decode_table("_.0:0;x.1").unwrap_err();
        match err {
            KeyError::MalformedKey { segment, reason, .. } => {
                assert_eq!(segment, Some(1));
                assert!(reason.contains("found 1"));
            }
        }
    }

    fn arb_group() -> impl Strategy<Value = VariantGroup> {
        (any::<u64>(), prop_oneof![Just(1u64), 1..=0x40u64, 0x10..u64::MAX])
            .prop_map(|(id, span)| VariantGroup::new(id, span))
    }

    fn arb_entry() -> impl Strategy<Value = TileMapEntry> {
        let class = prop_oneof![
            Just(ZygosityClass::HET),
            Just(ZygosityClass::HET_ALT),
            Just(ZygosityClass::HOM),
            Just(ZygosityClass::HOM_ALT),
        ];
        let allele = prop::collection::vec(arb_group(), 1..12);
        (class, prop::collection::vec(allele, DEFAULT_PLOIDY))
            .prop_map(|(class, alleles)| TileMapEntry::new(class, alleles))
    }

    proptest! {
        #[test]
        fn test_entry_round_trip(entry in arb_entry()) {
            let key = encode_entry(&entry);
            prop_assert!(!key.contains(';'));
            prop_assert_eq!(decode_entry(&key).unwrap(), entry);
        }

        #[test]
        fn test_table_round_trip_generated(entries in prop::collection::vec(arb_entry(), 0..24)) {
            let table = TileMap::new(entries);
            let encoded = encode_table(&table);
            prop_assert_eq!(decode_table(&encoded).unwrap(), table);
        }

        #[test]
        fn test_encoded_hex_is_canonical(entry in arb_entry()) {
            let key = encode_entry(&entry);
            prop_assert!(!key.contains("+1,") && !key.contains("+1:") && !key.ends_with("+1"));
            prop_assert!(key[2..].bytes().all(|b| b"0123456789abcdef:,+".contains(&b)));
        }
    }

    #[test]
    fn test_empty_table() {
        let empty = TileMap::default();
        assert_eq!(encode_table(&empty), "");
        assert!(decode_table("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_table_names_segment() {
        let err = decode_table("_.0:0;x.1:0;x.zz:0").unwrap_err();
        match err {
            KeyError::MalformedKey { segment, key, .. } => {
                assert_eq!(segment, Some(2));
                assert_eq!(key, "x.zz:0");
            }
        }

        let err = decode_table("_.0:0;").unwrap_err();
        assert!(err.to_string().contains("segment 1"));
    }
}
