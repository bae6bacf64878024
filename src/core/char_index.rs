//! Dense single-character index over TileMap positions.
//!
//! Each step of a call string is one ASCII character. Ordinary characters name
//! a TileMap position directly; reserved characters are sentinels. The
//! persisted form is a label-to-code table (`CharMap`) where negative codes
//! mark the reserved characters, plus the canonical ordering string
//! (`CanonicalCharMap`) used when writing.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::core::types::{SentinelKind, TilePosition};

/// Canonical dense alphabet: the character at index `i` names position `i`
pub const DEFAULT_CANONICAL_ALPHABET: &str =
    ".BCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz012345678";

/// Legacy synonym for position 0 accepted on input
pub const LEGACY_ZERO_ALIAS: char = 'A';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlphabetError {
    #[error("Inconsistent alphabet: {0}")]
    InconsistentAlphabet(String),
}

/// Which characters are reserved, and which character is canonical for position 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphabetConfig {
    /// Reserved characters, their sentinel kind and persisted (negative) code
    pub reserved: Vec<(char, SentinelKind, i64)>,
    /// Character written for position 0
    pub canonical_zero: char,
}

impl Default for AlphabetConfig {
    fn default() -> Self {
        Self {
            reserved: vec![
                ('-', SentinelKind::Gap, -1),
                ('#', SentinelKind::Overflow, -2),
                ('*', SentinelKind::Wildcard, -3),
                ('^', SentinelKind::Reserved, -4),
            ],
            canonical_zero: '.',
        }
    }
}

impl AlphabetConfig {
    fn sentinel_for(&self, c: char) -> Option<SentinelKind> {
        self.reserved
            .iter()
            .find(|(r, _, _)| *r == c)
            .map(|(_, kind, _)| *kind)
    }
}

/// Result of looking up one call-string character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharLookup {
    Position(TilePosition),
    Sentinel(SentinelKind),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Unassigned,
    Position(TilePosition),
    Sentinel(SentinelKind),
}

/// Bidirectional character/position map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharIndex {
    slots: [Slot; 128],
    /// position -> canonical character
    canonical: Vec<char>,
    /// sentinel kind -> (character, persisted code)
    sentinels: Vec<(SentinelKind, char, i64)>,
}

impl Default for CharIndex {
    fn default() -> Self {
        let mut index = Self::empty(&AlphabetConfig::default());
        for (pos, c) in DEFAULT_CANONICAL_ALPHABET.chars().enumerate() {
            index.slots[c as usize] = Slot::Position(pos);
            index.canonical.push(c);
        }
        index.slots[LEGACY_ZERO_ALIAS as usize] = Slot::Position(0);
        index
    }
}

impl CharIndex {
    fn empty(config: &AlphabetConfig) -> Self {
        let mut slots = [Slot::Unassigned; 128];
        let mut sentinels = Vec::with_capacity(config.reserved.len());
        for &(c, kind, code) in &config.reserved {
            if c.is_ascii() {
                slots[c as usize] = Slot::Sentinel(kind);
                sentinels.push((kind, c, code));
            }
        }
        Self {
            slots,
            canonical: Vec::new(),
            sentinels,
        }
    }

    /// Build from a persisted label -> code table.
    ///
    /// Negative codes mark reserved characters; the sentinel kind comes from
    /// `config`. Position 0 may carry the canonical character plus one alias;
    /// every other position has exactly one character. When `canonical` is
    /// given, its non-reserved characters must agree with the table.
    ///
    /// # Errors
    ///
    /// Returns `AlphabetError::InconsistentAlphabet` on duplicate codes, a
    /// reserved character with a non-negative code, a negative code on an
    /// unreserved character, labels that are not single ASCII characters, or
    /// a missing position 0.
    pub fn from_table(
        table: &BTreeMap<String, i64>,
        canonical: Option<&str>,
        config: &AlphabetConfig,
    ) -> Result<Self, AlphabetError> {
        // Only characters present in the table are assigned, sentinels included
        let mut index = Self {
            slots: [Slot::Unassigned; 128],
            canonical: Vec::new(),
            sentinels: Vec::new(),
        };

        let mut by_code: HashMap<i64, Vec<char>> = HashMap::new();

        for (label, &code) in table {
            let c = single_ascii_char(label).ok_or_else(|| {
                inconsistent(format!("label '{label}' is not a single ASCII character"))
            })?;
            by_code.entry(code).or_default().push(c);

            match (config.sentinel_for(c), code < 0) {
                (Some(kind), true) => {
                    index.slots[c as usize] = Slot::Sentinel(kind);
                    index.sentinels.push((kind, c, code));
                }
                (Some(_), false) => {
                    return Err(inconsistent(format!(
                        "reserved character '{c}' assigned position {code}"
                    )));
                }
                (None, true) => {
                    return Err(inconsistent(format!(
                        "character '{c}' has negative code {code} but is not reserved"
                    )));
                }
                (None, false) => {
                    let pos = usize::try_from(code)
                        .map_err(|_| inconsistent(format!("code {code} out of range")))?;
                    index.slots[c as usize] = Slot::Position(pos);
                }
            }
        }

        for (&code, chars) in &mut by_code {
            chars.sort_unstable();
            let limit = if code == 0 { 2 } else { 1 };
            if chars.len() > limit {
                return Err(inconsistent(format!(
                    "code {code} assigned to {}",
                    chars
                        .iter()
                        .map(|c| format!("'{c}'"))
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }

        let zero = by_code
            .get(&0)
            .ok_or_else(|| inconsistent("no character assigned to position 0"))?;
        let preferred_zero = canonical
            .and_then(|order| order.chars().next())
            .unwrap_or(config.canonical_zero);
        let zero_char = if zero.len() == 1 {
            zero[0]
        } else if zero.contains(&preferred_zero) {
            preferred_zero
        } else {
            return Err(inconsistent(format!(
                "position 0 has two characters but neither is '{preferred_zero}'"
            )));
        };

        // Dense characters are contiguous from 0; the first unassigned code ends the alphabet
        index.canonical.push(zero_char);
        while let Some(chars) = i64::try_from(index.canonical.len())
            .ok()
            .and_then(|code| by_code.get(&code))
        {
            index.canonical.push(chars[0]);
        }

        if let Some(order) = canonical {
            for (pos, c) in order.chars().enumerate() {
                if config.sentinel_for(c).is_some() {
                    continue;
                }
                if index.position_of(c) != CharLookup::Position(pos) {
                    return Err(inconsistent(format!(
                        "canonical character '{c}' at {pos} disagrees with the code table"
                    )));
                }
            }
        }

        index
            .sentinels
            .sort_by_key(|&(_, _, code)| std::cmp::Reverse(code));

        Ok(index)
    }

    /// Resolve one call-string character
    #[must_use]
    pub fn position_of(&self, c: char) -> CharLookup {
        if !c.is_ascii() {
            return CharLookup::Unknown;
        }
        match self.slots[c as usize] {
            Slot::Unassigned => CharLookup::Unknown,
            Slot::Position(pos) => CharLookup::Position(pos),
            Slot::Sentinel(kind) => CharLookup::Sentinel(kind),
        }
    }

    /// Canonical character for a position, or `None` when the dense alphabet
    /// has no slot for it and the call must go through the overflow tiers
    #[must_use]
    pub fn char_of(&self, position: TilePosition) -> Option<char> {
        self.canonical.get(position).copied()
    }

    /// Character that represents a sentinel kind
    #[must_use]
    pub fn sentinel_char(&self, kind: SentinelKind) -> Option<char> {
        self.sentinels
            .iter()
            .find(|(k, _, _)| *k == kind)
            .map(|(_, c, _)| *c)
    }

    /// Number of positions with a dense character
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.canonical.len()
    }

    /// Canonical ordering string, position order
    #[must_use]
    pub fn canonical_string(&self) -> String {
        self.canonical.iter().collect()
    }

    /// Persisted label -> code table, aliases and sentinels included
    #[must_use]
    pub fn to_table(&self) -> BTreeMap<String, i64> {
        let mut table = BTreeMap::new();
        for (i, slot) in self.slots.iter().enumerate() {
            if let Slot::Position(pos) = slot {
                // Slots are indexed by ASCII value
                let c = char::from(i as u8);
                table.insert(c.to_string(), *pos as i64);
            }
        }
        for (_, c, code) in &self.sentinels {
            table.insert(c.to_string(), *code);
        }
        table
    }
}

fn single_ascii_char(label: &str) -> Option<char> {
    let mut chars = label.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Some(c),
        _ => None,
    }
}

fn inconsistent(msg: impl Into<String>) -> AlphabetError {
    AlphabetError::InconsistentAlphabet(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn test_default_alphabet() {
        let index = CharIndex::default();
        assert_eq!(index.capacity(), 61);
        assert_eq!(index.position_of('.'), CharLookup::Position(0));
        assert_eq!(index.position_of('A'), CharLookup::Position(0));
        assert_eq!(index.position_of('B'), CharLookup::Position(1));
        assert_eq!(index.position_of('8'), CharLookup::Position(60));
        assert_eq!(index.position_of('#'), CharLookup::Sentinel(SentinelKind::Overflow));
        assert_eq!(index.position_of('-'), CharLookup::Sentinel(SentinelKind::Gap));
        assert_eq!(index.position_of('*'), CharLookup::Sentinel(SentinelKind::Wildcard));
        assert_eq!(index.position_of('^'), CharLookup::Sentinel(SentinelKind::Reserved));
        assert_eq!(index.position_of('9'), CharLookup::Unknown);
        assert_eq!(index.position_of('é'), CharLookup::Unknown);
    }

    #[test]
    fn test_char_of_canonical_and_exhausted() {
        let index = CharIndex::default();
        assert_eq!(index.char_of(0), Some('.'));
        assert_eq!(index.char_of(1), Some('B'));
        assert_eq!(index.char_of(60), Some('8'));
        assert_eq!(index.char_of(61), None);
        assert_eq!(index.sentinel_char(SentinelKind::Overflow), Some('#'));
    }

    #[test]
    fn test_default_table_round_trip() {
        let index = CharIndex::default();
        let persisted = index.to_table();
        assert_eq!(persisted.get("A"), Some(&0));
        assert_eq!(persisted.get("#"), Some(&-2));

        let rebuilt = CharIndex::from_table(
            &persisted,
            Some(&index.canonical_string()),
            &AlphabetConfig::default(),
        )
        .unwrap();
        assert_eq!(rebuilt, index);
    }

    #[test]
    fn test_from_table_without_canonical_prefers_dot() {
        let t = table(&[("A", 0), (".", 0), ("B", 1), ("C", 2), ("#", -1), ("-", -3)]);
        let index = CharIndex::from_table(&t, None, &AlphabetConfig::default()).unwrap();
        assert_eq!(index.char_of(0), Some('.'));
        assert_eq!(index.char_of(2), Some('C'));
        assert_eq!(index.capacity(), 3);
        // Sentinel kind follows the character, not the code
        assert_eq!(index.position_of('#'), CharLookup::Sentinel(SentinelKind::Overflow));
        assert_eq!(index.sentinel_char(SentinelKind::Gap), Some('-'));
        assert_eq!(index.sentinel_char(SentinelKind::Wildcard), None);
    }

    #[test]
    fn test_from_table_rejects_duplicate_codes() {
        let t = table(&[(".", 0), ("B", 1), ("C", 1)]);
        let err = CharIndex::from_table(&t, None, &AlphabetConfig::default()).unwrap_err();
        assert!(matches!(err, AlphabetError::InconsistentAlphabet(_)));

        let t = table(&[(".", 0), ("A", 0), ("Z", 0)]);
        assert!(CharIndex::from_table(&t, None, &AlphabetConfig::default()).is_err());

        let t = table(&[(".", 0), ("#", -1), ("-", -1)]);
        assert!(CharIndex::from_table(&t, None, &AlphabetConfig::default()).is_err());
    }

    #[test]
    fn test_from_table_rejects_reserved_with_position() {
        let t = table(&[(".", 0), ("#", 5)]);
        let err = CharIndex::from_table(&t, None, &AlphabetConfig::default()).unwrap_err();
        assert!(err.to_string().contains("reserved character '#'"));
    }

    #[test]
    fn test_from_table_rejects_bad_labels() {
        let config = AlphabetConfig::default();
        assert!(CharIndex::from_table(&table(&[(".", 0), ("BB", 1)]), None, &config).is_err());
        assert!(CharIndex::from_table(&table(&[(".", 0), ("x", -7)]), None, &config).is_err());
        assert!(CharIndex::from_table(&table(&[("B", 1)]), None, &config).is_err());
    }

    #[test]
    fn test_canonical_must_agree() {
        let t = table(&[(".", 0), ("B", 1), ("C", 2)]);
        let config = AlphabetConfig::default();
        assert!(CharIndex::from_table(&t, Some(".BC"), &config).is_ok());
        assert!(CharIndex::from_table(&t, Some(".CB"), &config).is_err());
        // Legacy canonical strings carry the sentinels at their tail
        assert!(CharIndex::from_table(&t, Some(".BC*#-"), &config).is_ok());
    }

    #[test]
    fn test_omitted_reserved_character_is_unknown() {
        let t = table(&[(".", 0), ("B", 1), ("C", 2), ("-", -1), ("#", -2)]);
        let index = CharIndex::from_table(&t, None, &AlphabetConfig::default()).unwrap();

        assert_eq!(index.sentinel_char(SentinelKind::Wildcard), None);
        assert_eq!(index.position_of('*'), CharLookup::Unknown);
        assert_eq!(index.position_of('^'), CharLookup::Unknown);
        assert_eq!(index.position_of('#'), CharLookup::Sentinel(SentinelKind::Overflow));

        // Every sentinel that resolves has a character, and the reverse
        for c in ['-', '#', '*', '^'] {
            if let CharLookup::Sentinel(kind) = index.position_of(c) {
                assert_eq!(index.sentinel_char(kind), Some(c));
            }
        }
    }

    #[test]
    fn test_hole_ends_dense_alphabet() {
        let t = table(&[(".", 0), ("B", 1), ("D", 3)]);
        let index = CharIndex::from_table(&t, None, &AlphabetConfig::default()).unwrap();
        assert_eq!(index.capacity(), 2);
        assert_eq!(index.char_of(3), None);
        // Reading still resolves the character
        assert_eq!(index.position_of('D'), CharLookup::Position(3));
    }
}
