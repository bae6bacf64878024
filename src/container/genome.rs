use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::codec::key::encode_entry;
use crate::core::char_index::CharLookup;
use crate::core::library::TileLibrary;
use crate::core::overflow::{
    AnnotationRecord, FinalOverflowMap, OverflowMap, OverflowResolution, OverflowResolver,
};
use crate::core::tile_map::TileMapEntry;
use crate::core::types::{SentinelKind, TilePosition, ZygosityClass};

/// Container format version written by this crate
pub const CGF_VERSION: &str = "0.1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Path {path} out of range (container has {path_count} call strings)")]
    PathOutOfRange { path: usize, path_count: usize },

    #[error("Step {step} out of range on path {path} (length {len})")]
    StepOutOfRange { path: usize, step: usize, len: usize },

    #[error("Unknown call character {ch:?} at {path:x}:{step:x}")]
    UnknownCharacter { path: usize, step: usize, ch: char },

    #[error("TileMap position {position} at {path:x}:{step:x} exceeds TileMap length {len}")]
    PositionOutOfRange {
        path: usize,
        step: usize,
        position: TilePosition,
        len: usize,
    },

    #[error("Overflow character at {path:x}:{step:x} has no entry in either overflow map")]
    OverflowMissing { path: usize, step: usize },

    #[error("No TileMap entry matches {0}")]
    NotFound(String),
}

/// Resolved meaning of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call<'a> {
    /// A TileMap position (0 is the reference)
    Position(TilePosition),
    /// Gap, wildcard, or reserved sentinel: no position, and never the reference
    NoCall(SentinelKind),
    /// Terminal overflow record for a call with no TileMap entry
    Annotation(&'a AnnotationRecord),
}

/// Opaque pass-through metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerMetadata {
    pub cgf_version: String,
    pub encoding: String,
    pub notes: String,
    pub tile_library_version: String,
}

impl Default for ContainerMetadata {
    fn default() -> Self {
        Self {
            cgf_version: CGF_VERSION.to_string(),
            encoding: "utf8".to_string(),
            notes: String::new(),
            tile_library_version: String::new(),
        }
    }
}

/// Every field of a container, as read from storage or assembled by a builder.
///
/// No invariant is checked when a container is made from parts; run
/// [`GenomeContainer::validate`] for that.
#[derive(Debug, Clone, Default)]
pub struct ContainerParts {
    pub metadata: ContainerMetadata,
    pub path_count: usize,
    pub steps_per_path: Vec<usize>,
    pub cumulative_steps_per_path: Vec<usize>,
    pub total_steps: usize,
    /// path -> call string
    pub call_strings: BTreeMap<usize, String>,
    pub overflow: OverflowMap,
    pub final_overflow: FinalOverflowMap,
    /// `EncodedTileMapMd5Sum` as persisted
    pub declared_checksum: Option<String>,
    /// `EncodedTileMap` exactly as persisted
    pub encoded_tile_map: Option<String>,
}

/// Prefix sums of per-path step counts
#[must_use]
pub fn cumulative_steps(steps_per_path: &[usize]) -> Vec<usize> {
    steps_per_path
        .iter()
        .scan(0usize, |total, &n| {
            *total += n;
            Some(*total)
        })
        .collect()
}

/// One genome's call strings and overflow tiers over a shared tile library
#[derive(Debug, Clone)]
pub struct GenomeContainer {
    library: Arc<TileLibrary>,
    pub(crate) parts: ContainerParts,
}

impl GenomeContainer {
    /// Wrap parts as-is
    #[must_use]
    pub fn from_parts(library: Arc<TileLibrary>, parts: ContainerParts) -> Self {
        Self { library, parts }
    }

    /// An all-gap container with geometry derived from the step counts
    #[must_use]
    pub fn new(library: Arc<TileLibrary>, steps_per_path: Vec<usize>) -> Self {
        let gap = library
            .char_index()
            .sentinel_char(SentinelKind::Gap)
            .unwrap_or('-');
        let cumulative = cumulative_steps(&steps_per_path);
        let metadata = ContainerMetadata {
            tile_library_version: library.version().to_string(),
            ..ContainerMetadata::default()
        };

        let parts = ContainerParts {
            metadata,
            path_count: steps_per_path.len(),
            total_steps: cumulative.last().copied().unwrap_or(0),
            call_strings: steps_per_path
                .iter()
                .enumerate()
                .map(|(path, &n)| (path, gap.to_string().repeat(n)))
                .collect(),
            steps_per_path,
            cumulative_steps_per_path: cumulative,
            ..ContainerParts::default()
        };

        Self { library, parts }
    }

    #[must_use]
    pub fn library(&self) -> &Arc<TileLibrary> {
        &self.library
    }

    #[must_use]
    pub fn metadata(&self) -> &ContainerMetadata {
        &self.parts.metadata
    }

    #[must_use]
    pub fn path_count(&self) -> usize {
        self.parts.path_count
    }

    #[must_use]
    pub fn steps_per_path(&self) -> &[usize] {
        &self.parts.steps_per_path
    }

    #[must_use]
    pub fn cumulative_steps_per_path(&self) -> &[usize] {
        &self.parts.cumulative_steps_per_path
    }

    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.parts.total_steps
    }

    #[must_use]
    pub fn call_string(&self, path: usize) -> Option<&str> {
        self.parts.call_strings.get(&path).map(String::as_str)
    }

    #[must_use]
    pub fn call_strings(&self) -> &BTreeMap<usize, String> {
        &self.parts.call_strings
    }

    #[must_use]
    pub fn overflow_map(&self) -> &OverflowMap {
        &self.parts.overflow
    }

    #[must_use]
    pub fn final_overflow_map(&self) -> &FinalOverflowMap {
        &self.parts.final_overflow
    }

    #[must_use]
    pub fn overflow_resolver(&self) -> OverflowResolver<'_> {
        OverflowResolver::new(&self.parts.overflow, &self.parts.final_overflow)
    }

    fn calls(&self, path: usize) -> Result<&[u8], LookupError> {
        self.call_string(path)
            .map(str::as_bytes)
            .ok_or(LookupError::PathOutOfRange {
                path,
                path_count: self.parts.call_strings.len(),
            })
    }

    fn char_at(&self, path: usize, step: usize) -> Result<char, LookupError> {
        let calls = self.calls(path)?;
        let byte = *calls.get(step).ok_or(LookupError::StepOutOfRange {
            path,
            step,
            len: calls.len(),
        })?;
        if byte.is_ascii() {
            Ok(char::from(byte))
        } else {
            Err(LookupError::UnknownCharacter {
                path,
                step,
                ch: char::REPLACEMENT_CHARACTER,
            })
        }
    }

    fn bounded(&self, path: usize, step: usize, position: TilePosition) -> Result<Call<'_>, LookupError> {
        let len = self.library.len();
        if position < len {
            Ok(Call::Position(position))
        } else {
            Err(LookupError::PositionOutOfRange {
                path,
                step,
                position,
                len,
            })
        }
    }

    /// Resolve the call at `(path, step)`.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::PathOutOfRange`/`StepOutOfRange` for addresses
    /// outside the call strings, `UnknownCharacter` for characters outside the
    /// alphabet, `PositionOutOfRange` when the resolved position is past the
    /// TileMap, and `OverflowMissing` when an escape has no overflow entry.
    pub fn resolve_call(&self, path: usize, step: usize) -> Result<Call<'_>, LookupError> {
        let ch = self.char_at(path, step)?;

        match self.library.char_index().position_of(ch) {
            CharLookup::Position(position) => self.bounded(path, step, position),
            CharLookup::Sentinel(SentinelKind::Overflow) => {
                match self.overflow_resolver().resolve(path, step) {
                    OverflowResolution::Position(position) => self.bounded(path, step, position),
                    OverflowResolution::Annotation(record) => Ok(Call::Annotation(record)),
                    OverflowResolution::Missing => Err(LookupError::OverflowMissing { path, step }),
                }
            }
            CharLookup::Sentinel(kind) => Ok(Call::NoCall(kind)),
            CharLookup::Unknown => Err(LookupError::UnknownCharacter { path, step, ch }),
        }
    }

    /// True iff the TileMap entry at `position` has, on either allele, a group
    /// starting `step` steps after the call's anchor
    #[must_use]
    pub fn has_tile_variant(&self, step: usize, position: TilePosition) -> bool {
        self.library
            .tile_map()
            .get(position)
            .is_some_and(|entry| entry.has_group_at(step as u64))
    }

    /// Find the TileMap position of an exact (class, per-allele ids, per-allele lengths) combination.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::NotFound` if no entry matches structurally.
    pub fn lookup_tile_map_position(
        &self,
        class: ZygosityClass,
        allele_ids: &[Vec<u64>],
        allele_lengths: &[Vec<u64>],
    ) -> Result<TilePosition, LookupError> {
        let entry = TileMapEntry::from_parts(class, allele_ids, allele_lengths).ok_or_else(|| {
            LookupError::NotFound(format!(
                "{class} with mismatched id/length lists {allele_ids:?} / {allele_lengths:?}"
            ))
        })?;
        self.library
            .position_of(&entry)
            .ok_or_else(|| LookupError::NotFound(encode_entry(&entry)))
    }

    /// Step where the call covering `(path, step)` starts, walking back over
    /// wildcard continuation characters. `None` if only wildcards precede it.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::PathOutOfRange` or `StepOutOfRange` for bad addresses.
    pub fn anchor_of(&self, path: usize, step: usize) -> Result<Option<usize>, LookupError> {
        self.char_at(path, step)?;
        let calls = self.calls(path)?;
        let wildcard = self.library.char_index().sentinel_char(SentinelKind::Wildcard);

        Ok((0..=step)
            .rev()
            .find(|&s| Some(char::from(calls[s])) != wildcard))
    }

    /// True iff the call covering `(path, step)` has a group for `variant_id`
    /// that starts exactly at `step`.
    ///
    /// # Errors
    ///
    /// Returns any error from resolving the anchoring call.
    pub fn has_call_variant(
        &self,
        path: usize,
        step: usize,
        variant_id: u64,
    ) -> Result<bool, LookupError> {
        let Some(anchor) = self.anchor_of(path, step)? else {
            return Ok(false);
        };
        match self.resolve_call(path, anchor)? {
            Call::Position(position) => Ok(self
                .library
                .tile_map()
                .get(position)
                .is_some_and(|entry| entry.has_variant_at((step - anchor) as u64, variant_id))),
            Call::NoCall(_) | Call::Annotation(_) => Ok(false),
        }
    }

    /// Per-allele tile ids (`path.version.step.variant[+span]`, hex) of the
    /// call covering `(path, step)`. Empty when the step carries no position.
    ///
    /// # Errors
    ///
    /// Returns any error from resolving the anchoring call.
    pub fn tile_ids(
        &self,
        path: usize,
        step: usize,
        library_version: u32,
    ) -> Result<Vec<Vec<String>>, LookupError> {
        let Some(anchor) = self.anchor_of(path, step)? else {
            return Ok(Vec::new());
        };
        let Call::Position(position) = self.resolve_call(path, anchor)? else {
            return Ok(Vec::new());
        };
        let Some(entry) = self.library.tile_map().get(position) else {
            return Ok(Vec::new());
        };

        Ok((0..entry.ploidy())
            .map(|allele| {
                entry
                    .groups_with_offsets(allele)
                    .map(|(offset, group)| {
                        let mut id = format!(
                            "{path:03x}.{library_version:02x}.{:04x}.{:04x}",
                            anchor as u64 + offset,
                            group.variant_id
                        );
                        if group.span > 1 {
                            id.push_str(&format!("+{:x}", group.span));
                        }
                        id
                    })
                    .collect()
            })
            .collect())
    }

    /// Raw call characters for `range` on `path`
    ///
    /// # Errors
    ///
    /// Returns `LookupError::PathOutOfRange` or `StepOutOfRange` when the range
    /// does not fit the call string.
    pub fn call_slice(
        &self,
        path: usize,
        range: std::ops::Range<usize>,
    ) -> Result<&str, LookupError> {
        let calls = self
            .call_string(path)
            .ok_or(LookupError::PathOutOfRange {
                path,
                path_count: self.parts.call_strings.len(),
            })?;
        calls.get(range.clone()).ok_or(LookupError::StepOutOfRange {
            path,
            step: range.end,
            len: calls.len(),
        })
    }
}
