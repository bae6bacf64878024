use serde::{Deserialize, Serialize};

use crate::core::types::{TilePosition, ZygosityClass};

/// Number of allele copies in all observed libraries
pub const DEFAULT_PLOIDY: usize = 2;

/// One tile variant covering `span` consecutive reference steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantGroup {
    pub variant_id: u64,
    pub span: u64,
}

impl VariantGroup {
    #[must_use]
    pub fn new(variant_id: u64, span: u64) -> Self {
        Self { variant_id, span }
    }

    /// A variant covering exactly one step
    #[must_use]
    pub fn single(variant_id: u64) -> Self {
        Self::new(variant_id, 1)
    }
}

/// One catalogued combination of variant calls at a tile step.
///
/// `alleles` holds one ordered group list per allele copy. Equality and hashing
/// are structural: same class, same per-allele ordered groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileMapEntry {
    pub class: ZygosityClass,
    pub alleles: Vec<Vec<VariantGroup>>,
}

impl TileMapEntry {
    pub fn new(class: ZygosityClass, alleles: Vec<Vec<VariantGroup>>) -> Self {
        Self { class, alleles }
    }

    /// The no-variant entry that always sits at TileMap position 0
    #[must_use]
    pub fn reference() -> Self {
        Self::new(
            ZygosityClass::HOM,
            vec![vec![VariantGroup::single(0)]; DEFAULT_PLOIDY],
        )
    }

    /// Build an entry from parallel id/length lists, one pair of lists per allele.
    ///
    /// Returns `None` when the lists do not line up.
    #[must_use]
    pub fn from_parts(
        class: ZygosityClass,
        allele_ids: &[Vec<u64>],
        allele_lengths: &[Vec<u64>],
    ) -> Option<Self> {
        if allele_ids.len() != allele_lengths.len() {
            return None;
        }

        let mut alleles = Vec::with_capacity(allele_ids.len());
        for (ids, lengths) in allele_ids.iter().zip(allele_lengths) {
            if ids.len() != lengths.len() {
                return None;
            }
            alleles.push(
                ids.iter()
                    .zip(lengths)
                    .map(|(&id, &len)| VariantGroup::new(id, len))
                    .collect(),
            );
        }

        Some(Self::new(class, alleles))
    }

    #[must_use]
    pub fn ploidy(&self) -> usize {
        self.alleles.len()
    }

    /// Exactly [`DEFAULT_PLOIDY`] alleles, every allele non-empty, every span at least 1
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.alleles.len() == DEFAULT_PLOIDY
            && self
                .alleles
                .iter()
                .all(|groups| !groups.is_empty() && groups.iter().all(|g| g.span >= 1))
    }

    /// Number of reference steps the call covers (longest allele)
    #[must_use]
    pub fn span(&self) -> u64 {
        self.alleles
            .iter()
            .map(|groups| groups.iter().map(|g| g.span).sum::<u64>())
            .max()
            .unwrap_or(0)
    }

    /// Groups of one allele paired with their step offset from the call anchor
    pub fn groups_with_offsets(
        &self,
        allele: usize,
    ) -> impl Iterator<Item = (u64, &VariantGroup)> + '_ {
        let mut offset = 0;
        self.alleles
            .get(allele)
            .into_iter()
            .flatten()
            .map(move |group| {
                let start = offset;
                offset += group.span;
                (start, group)
            })
    }

    /// True if any allele has a group starting `offset` steps after the anchor
    #[must_use]
    pub fn has_group_at(&self, offset: u64) -> bool {
        (0..self.ploidy()).any(|a| self.groups_with_offsets(a).any(|(start, _)| start == offset))
    }

    /// True if any allele has a group for `variant_id` starting at `offset`
    #[must_use]
    pub fn has_variant_at(&self, offset: u64, variant_id: u64) -> bool {
        (0..self.ploidy()).any(|a| {
            self.groups_with_offsets(a)
                .any(|(start, g)| start == offset && g.variant_id == variant_id)
        })
    }

    /// Hom entries store every copy; they are expected to be identical
    #[must_use]
    pub fn alleles_agree(&self) -> bool {
        self.alleles.windows(2).all(|w| w[0] == w[1])
    }
}

/// Ordered catalogue of unique entries; the index is the TileMap position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileMap {
    entries: Vec<TileMapEntry>,
}

impl TileMap {
    #[must_use]
    pub fn new(entries: Vec<TileMapEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, position: TilePosition) -> Option<&TileMapEntry> {
        self.entries.get(position)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TileMapEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn entries(&self) -> &[TileMapEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: TileMapEntry) -> TilePosition {
        self.entries.push(entry);
        self.entries.len() - 1
    }
}

impl From<Vec<TileMapEntry>> for TileMap {
    fn from(entries: Vec<TileMapEntry>) -> Self {
        Self::new(entries)
    }
}

impl<'a> IntoIterator for &'a TileMap {
    type Item = &'a TileMapEntry;
    type IntoIter = std::slice::Iter<'a, TileMapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Structured (non-encoded) persisted form of a TileMap entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TileMapRecord {
    #[serde(rename = "Type")]
    pub class: ZygosityClass,
    pub ploidy: usize,
    pub variant: Vec<Vec<u64>>,
    pub variant_length: Vec<Vec<u64>>,
}

impl From<&TileMapEntry> for TileMapRecord {
    fn from(entry: &TileMapEntry) -> Self {
        Self {
            class: entry.class,
            ploidy: entry.ploidy(),
            variant: entry
                .alleles
                .iter()
                .map(|groups| groups.iter().map(|g| g.variant_id).collect())
                .collect(),
            variant_length: entry
                .alleles
                .iter()
                .map(|groups| groups.iter().map(|g| g.span).collect())
                .collect(),
        }
    }
}

impl TryFrom<TileMapRecord> for TileMapEntry {
    type Error = String;

    fn try_from(record: TileMapRecord) -> Result<Self, Self::Error> {
        if record.ploidy != DEFAULT_PLOIDY {
            return Err(format!(
                "ploidy {} is not supported (expected {DEFAULT_PLOIDY})",
                record.ploidy
            ));
        }
        if record.variant.len() != record.ploidy {
            return Err(format!(
                "ploidy {} does not match {} variant lists",
                record.ploidy,
                record.variant.len()
            ));
        }
        let entry = Self::from_parts(record.class, &record.variant, &record.variant_length)
            .ok_or_else(|| "variant and length lists differ in shape".to_string())?;
        if !entry.is_well_formed() {
            return Err("empty allele or zero-length span".to_string());
        }
        Ok(entry)
    }
}
