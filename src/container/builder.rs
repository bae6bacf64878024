use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::codec::key::encode_entry;
use crate::container::genome::{ContainerMetadata, GenomeContainer};
use crate::core::library::TileLibrary;
use crate::core::overflow::{AnnotationRecord, OverflowKey};
use crate::core::tile_map::TileMapEntry;
use crate::core::types::{SentinelKind, TilePosition, ZygosityClass};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Path {path} out of range (container has {path_count} paths)")]
    PathOutOfRange { path: usize, path_count: usize },

    #[error("Call at {path:x}:{step:x} spanning {span} step(s) runs past path length {len}")]
    StepOutOfRange {
        path: usize,
        step: usize,
        span: u64,
        len: usize,
    },

    #[error("Call at {path:x}:{step:x} overlaps a step that is already filled")]
    Overlap { path: usize, step: usize },

    #[error("Call at {path:x}:{step:x} has mismatched id/length lists, an empty allele, or a zero span")]
    MalformedCall { path: usize, step: usize },

    #[error("Alphabet has no {0} character")]
    MissingSentinel(SentinelKind),
}

/// How a call was written into the call string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEncoding {
    /// Dense character for the position
    Dense(char),
    /// Escape character plus a tier-1 overflow entry
    Overflow(TilePosition),
    /// Escape character plus a terminal annotation
    Annotation,
}

/// Assembles one genome's call strings from per-step calls.
///
/// Every step starts as a gap. A call writes its character at the anchor step
/// and the wildcard continuation character over the rest of its span.
#[derive(Debug)]
pub struct GenomeBuilder {
    container: GenomeContainer,
    calls: Vec<Vec<u8>>,
    gap: u8,
    wildcard: u8,
    escape: u8,
}

fn sentinel_byte(library: &TileLibrary, kind: SentinelKind) -> Result<u8, BuildError> {
    library
        .char_index()
        .sentinel_char(kind)
        .filter(char::is_ascii)
        .map(|c| c as u8)
        .ok_or(BuildError::MissingSentinel(kind))
}

impl GenomeBuilder {
    /// Start an all-gap genome with the given per-path step counts.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::MissingSentinel` if the library's alphabet lacks a
    /// gap, wildcard, or overflow character.
    pub fn new(library: Arc<TileLibrary>, steps_per_path: Vec<usize>) -> Result<Self, BuildError> {
        let gap = sentinel_byte(&library, SentinelKind::Gap)?;
        let wildcard = sentinel_byte(&library, SentinelKind::Wildcard)?;
        let escape = sentinel_byte(&library, SentinelKind::Overflow)?;

        let calls = steps_per_path.iter().map(|&n| vec![gap; n]).collect();
        let container = GenomeContainer::new(library, steps_per_path);

        Ok(Self {
            container,
            calls,
            gap,
            wildcard,
            escape,
        })
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: ContainerMetadata) -> Self {
        self.container.parts.metadata = metadata;
        self
    }

    /// Claim `span` steps starting at `step`, checking bounds and overlap
    fn claim(&mut self, path: usize, step: usize, span: u64) -> Result<&mut [u8], BuildError> {
        let path_count = self.calls.len();
        let gap = self.gap;
        let calls = self
            .calls
            .get_mut(path)
            .ok_or(BuildError::PathOutOfRange { path, path_count })?;

        let len = calls.len();
        let end = usize::try_from(span)
            .ok()
            .and_then(|span| step.checked_add(span))
            .filter(|&end| end <= len && step < len)
            .ok_or(BuildError::StepOutOfRange {
                path,
                step,
                span,
                len,
            })?;

        let slots = &mut calls[step..end];
        if let Some(offset) = slots.iter().position(|&c| c != gap) {
            return Err(BuildError::Overlap {
                path,
                step: step + offset,
            });
        }
        Ok(slots)
    }

    /// Record a call given as a class plus per-allele variant ids and spans.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::MalformedCall` if the lists don't form a
    /// well-formed entry, plus any error from [`GenomeBuilder::add_entry`].
    pub fn add_call(
        &mut self,
        path: usize,
        step: usize,
        class: ZygosityClass,
        allele_ids: &[Vec<u64>],
        allele_lengths: &[Vec<u64>],
    ) -> Result<CallEncoding, BuildError> {
        let entry = TileMapEntry::from_parts(class, allele_ids, allele_lengths)
            .ok_or(BuildError::MalformedCall { path, step })?;
        self.add_entry(path, step, &entry)
    }

    /// Record a call.
    ///
    /// Known entries with a dense character are written directly, known
    /// entries past the alphabet go to the tier-1 overflow map, and unknown
    /// entries get a terminal annotation naming their key.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::PathOutOfRange`, `StepOutOfRange` or `Overlap` if
    /// the call's span does not fit into unfilled steps, or `MalformedCall`
    /// for an ill-formed entry.
    pub fn add_entry(
        &mut self,
        path: usize,
        step: usize,
        entry: &TileMapEntry,
    ) -> Result<CallEncoding, BuildError> {
        if !entry.is_well_formed() {
            return Err(BuildError::MalformedCall { path, step });
        }

        let library = Arc::clone(self.container.library());
        let key = OverflowKey::new(path, step).to_string();

        let (first, encoding) = match library.position_of(entry) {
            Some(position) => match library.char_index().char_of(position) {
                Some(c) if c.is_ascii() => (c as u8, CallEncoding::Dense(c)),
                _ => (self.escape, CallEncoding::Overflow(position)),
            },
            None => (self.escape, CallEncoding::Annotation),
        };

        let wildcard = self.wildcard;
        let slots = self.claim(path, step, entry.span())?;
        slots[0] = first;
        slots[1..].fill(wildcard);

        match encoding {
            CallEncoding::Dense(_) => {}
            CallEncoding::Overflow(position) => {
                debug!("Alphabet exhausted at {key}, overflowing position {position}");
                self.container.parts.overflow.insert(key, position);
            }
            CallEncoding::Annotation => {
                let var_key = encode_entry(entry);
                debug!("No TileMap entry for {var_key} at {key}");
                let payload = json!({
                    "Message": "no TileMap entry",
                    "VarKey": var_key,
                });
                self.container
                    .parts
                    .final_overflow
                    .insert(key, AnnotationRecord::new("message", payload.to_string()));
            }
        }

        Ok(encoding)
    }

    /// Attach an opaque annotation to `span` steps starting at `step`.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::PathOutOfRange`, `StepOutOfRange` or `Overlap`
    /// when the steps are not available, and `MalformedCall` for a zero span.
    pub fn add_annotation(
        &mut self,
        path: usize,
        step: usize,
        span: u64,
        record: AnnotationRecord,
    ) -> Result<(), BuildError> {
        if span == 0 {
            return Err(BuildError::MalformedCall { path, step });
        }
        let (escape, wildcard) = (self.escape, self.wildcard);
        let slots = self.claim(path, step, span)?;
        slots[0] = escape;
        slots[1..].fill(wildcard);

        self.container
            .parts
            .final_overflow
            .insert(OverflowKey::new(path, step).to_string(), record);
        Ok(())
    }

    /// Produce the container. Steps never filled remain gaps.
    #[must_use]
    pub fn finish(mut self) -> GenomeContainer {
        self.container.parts.call_strings = self
            .calls
            .into_iter()
            .enumerate()
            .map(|(path, bytes)| (path, bytes.into_iter().map(char::from).collect()))
            .collect();
        self.container
    }
}
