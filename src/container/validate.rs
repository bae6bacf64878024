//! Structural validation of a genome container.
//!
//! Validation never stops at the first problem: every violation found is
//! reported. Paths are checked in parallel.

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::container::genome::{cumulative_steps, GenomeContainer, LookupError};
use crate::core::char_index::CharLookup;
use crate::core::overflow::OverflowKey;
use crate::core::tile_map::TileMapEntry;
use crate::core::types::{SentinelKind, TilePosition};
use crate::utils::validation::tile_map_checksum;

/// One broken invariant
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    #[error("PathCount is {path_count} but {listed} step counts are listed")]
    PathCountMismatch { path_count: usize, listed: usize },

    #[error("StepPerPathSum[{path}] is {found:?}, expected {expected}")]
    CumulativeMismatch {
        path: usize,
        expected: usize,
        found: Option<usize>,
    },

    #[error("TotalStep is {found}, expected {expected}")]
    TotalStepMismatch { expected: usize, found: usize },

    #[error("Path {path:x} has no call string")]
    MissingCallString { path: usize },

    #[error("Call string for path {path:x} is outside PathCount")]
    ExtraCallString { path: usize },

    #[error("Call string for path {path:x} has length {found}, expected {expected}")]
    CallLengthMismatch {
        path: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unknown call character {ch:?} at {path:x}:{step:x}")]
    UnknownCharacter { path: usize, step: usize, ch: char },

    #[error("Position {position} at {path:x}:{step:x} exceeds TileMap length {len}")]
    PositionOutOfRange {
        path: usize,
        step: usize,
        position: TilePosition,
        len: usize,
    },

    #[error("Overflow character at {path:x}:{step:x} has no overflow entry")]
    OverflowMissing { path: usize, step: usize },

    #[error("Overflow key {path:x}:{step:x} is present in both overflow tiers")]
    OverflowAmbiguous { path: usize, step: usize },

    #[error("Overflow key '{key}' does not correspond to an overflow character: {reason}")]
    OrphanOverflow { key: String, reason: String },

    #[error("EncodedTileMapMd5Sum is {declared}, but the TileMap hashes to {computed}")]
    TileMapChecksumMismatch { declared: String, computed: String },

    #[error("TileMap position 0 is not the reference entry")]
    ReferenceEntryMissing,

    #[error("Homozygous TileMap entry at position {position} has differing alleles")]
    HomAllelesDiverge { position: TilePosition },
}

/// How homozygous entries with differing stored alleles are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomPolicy {
    /// Accept them; the stored alleles are authoritative
    #[default]
    Tolerate,
    /// Report each as `Violation::HomAllelesDiverge`
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationConfig {
    pub hom_policy: HomPolicy,
    pub verify_checksum: bool,
    pub check_orphans: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            hom_policy: HomPolicy::Tolerate,
            verify_checksum: true,
            check_orphans: true,
        }
    }
}

impl ValidationConfig {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            hom_policy: HomPolicy::Strict,
            ..Self::default()
        }
    }
}

impl From<LookupError> for Violation {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::UnknownCharacter { path, step, ch } => {
                Violation::UnknownCharacter { path, step, ch }
            }
            LookupError::PositionOutOfRange {
                path,
                step,
                position,
                len,
            } => Violation::PositionOutOfRange {
                path,
                step,
                position,
                len,
            },
            LookupError::OverflowMissing { path, step } => Violation::OverflowMissing { path, step },
            LookupError::PathOutOfRange { path, .. } => Violation::MissingCallString { path },
            LookupError::StepOutOfRange { path, step, len } => Violation::CallLengthMismatch {
                path,
                expected: step + 1,
                found: len,
            },
            LookupError::NotFound(key) => Violation::OrphanOverflow {
                key,
                reason: "no TileMap entry".to_string(),
            },
        }
    }
}

impl GenomeContainer {
    /// Validate with the default configuration
    #[must_use]
    pub fn validate(&self) -> Vec<Violation> {
        self.validate_with(&ValidationConfig::default())
    }

    /// Check every container invariant, returning all violations found
    #[must_use]
    pub fn validate_with(&self, config: &ValidationConfig) -> Vec<Violation> {
        let mut violations = self.validate_geometry();
        violations.extend(self.validate_library(config));

        let paths: Vec<(usize, &String)> = self
            .call_strings()
            .iter()
            .map(|(&path, calls)| (path, calls))
            .collect();
        let per_path: Vec<Vec<Violation>> = paths
            .par_iter()
            .map(|&(path, calls)| self.validate_path(path, calls))
            .collect();
        violations.extend(per_path.into_iter().flatten());

        if config.check_orphans {
            violations.extend(self.validate_overflow_keys());
        }

        debug!("Validation found {} violation(s)", violations.len());
        violations
    }

    fn validate_geometry(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let steps = self.steps_per_path();

        if self.path_count() != steps.len() {
            violations.push(Violation::PathCountMismatch {
                path_count: self.path_count(),
                listed: steps.len(),
            });
        }

        let expected = cumulative_steps(steps);
        let found = self.cumulative_steps_per_path();
        for path in 0..expected.len().max(found.len()) {
            let want = expected.get(path).copied();
            let got = found.get(path).copied();
            if want != got {
                violations.push(Violation::CumulativeMismatch {
                    path,
                    expected: want.unwrap_or(0),
                    found: got,
                });
            }
        }

        let total: usize = steps.iter().sum();
        if self.total_steps() != total {
            violations.push(Violation::TotalStepMismatch {
                expected: total,
                found: self.total_steps(),
            });
        }

        for path in 0..self.path_count() {
            if self.call_string(path).is_none() {
                violations.push(Violation::MissingCallString { path });
            }
        }
        for &path in self.call_strings().keys() {
            if path >= self.path_count() {
                violations.push(Violation::ExtraCallString { path });
            }
        }

        violations
    }

    fn validate_library(&self, config: &ValidationConfig) -> Vec<Violation> {
        let mut violations = Vec::new();
        let library = self.library();

        if config.verify_checksum {
            if let Some(declared) = &self.parts.declared_checksum {
                let computed = self
                    .parts
                    .encoded_tile_map
                    .as_deref()
                    .map_or_else(|| library.checksum().to_string(), tile_map_checksum);
                if *declared != computed {
                    violations.push(Violation::TileMapChecksumMismatch {
                        declared: declared.clone(),
                        computed,
                    });
                }
            }
        }

        if library.tile_map().get(0) != Some(&TileMapEntry::reference()) {
            violations.push(Violation::ReferenceEntryMissing);
        }

        if config.hom_policy == HomPolicy::Strict {
            violations.extend(
                library
                    .tile_map()
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.class.is_hom() && !entry.alleles_agree())
                    .map(|(position, _)| Violation::HomAllelesDiverge { position }),
            );
        }

        violations
    }

    fn validate_path(&self, path: usize, calls: &str) -> Vec<Violation> {
        let mut violations = Vec::new();

        if let Some(&expected) = self.steps_per_path().get(path) {
            if calls.len() != expected {
                violations.push(Violation::CallLengthMismatch {
                    path,
                    expected,
                    found: calls.len(),
                });
            }
        }

        let resolver = self.overflow_resolver();
        let overflow_char = self
            .library()
            .char_index()
            .sentinel_char(SentinelKind::Overflow);

        for step in 0..calls.len() {
            if let Err(err) = self.resolve_call(path, step) {
                violations.push(err.into());
                continue;
            }
            if Some(char::from(calls.as_bytes()[step])) == overflow_char
                && resolver.has_position(path, step)
                && resolver.has_annotation(path, step)
            {
                violations.push(Violation::OverflowAmbiguous { path, step });
            }
        }

        violations
    }

    fn validate_overflow_keys(&self) -> Vec<Violation> {
        let index = self.library().char_index();
        let keys = self
            .overflow_map()
            .keys()
            .chain(self.final_overflow_map().keys());

        keys.filter_map(|key| {
            let reason = match key.parse::<OverflowKey>() {
                Err(e) => e,
                Ok(OverflowKey { path, step }) => match self.call_string(path) {
                    None => format!("path {path:x} has no call string"),
                    Some(calls) => match calls.as_bytes().get(step) {
                        None => format!("step {step:x} is past the end of path {path:x}"),
                        Some(&b) => match index.position_of(char::from(b)) {
                            CharLookup::Sentinel(SentinelKind::Overflow) => return None,
                            _ => format!("call character is {:?}", char::from(b)),
                        },
                    },
                },
            };
            Some(Violation::OrphanOverflow {
                key: key.clone(),
                reason,
            })
        })
        .collect()
    }
}

/// Validate many containers in parallel; results line up with the input
#[must_use]
pub fn validate_all(containers: &[GenomeContainer], config: &ValidationConfig) -> Vec<Vec<Violation>> {
    containers
        .par_iter()
        .map(|container| container.validate_with(config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::genome::tests::{sample_container, sample_library};
    use crate::core::overflow::AnnotationRecord;
    use crate::core::tile_map::TileMap;
    use crate::core::char_index::CharIndex;
    use crate::core::library::TileLibrary;
    use crate::codec::key::decode_table;
    use std::sync::Arc;

    fn valid_container() -> GenomeContainer {
        let mut container = sample_container();
        container.parts.call_strings.insert(1, "#*^.".to_string());
        container
    }

    #[test]
    fn test_valid_container_passes() {
        let container = valid_container();
        assert_eq!(container.validate(), Vec::<Violation>::new());
    }

    #[test]
    fn test_geometry_checks() {
        let mut container = GenomeContainer::new(sample_library(), vec![35, 32, 38, 10]);
        assert!(container.validate().is_empty());

        container.parts.cumulative_steps_per_path = vec![35, 67, 104, 115];
        container.parts.total_steps = 114;
        container.parts.path_count = 5;
        let violations = container.validate();
        assert!(violations.contains(&Violation::CumulativeMismatch {
            path: 2,
            expected: 105,
            found: Some(104)
        }));
        assert!(violations.contains(&Violation::TotalStepMismatch {
            expected: 115,
            found: 114
        }));
        assert!(violations.contains(&Violation::PathCountMismatch {
            path_count: 5,
            listed: 4
        }));
        assert!(violations.contains(&Violation::MissingCallString { path: 4 }));
    }

    #[test]
    fn test_call_length_mismatch() {
        let mut container = valid_container();
        container.parts.call_strings.insert(1, "#*^".to_string());
        assert_eq!(
            container.validate(),
            vec![Violation::CallLengthMismatch {
                path: 1,
                expected: 4,
                found: 3
            }]
        );
    }

    #[test]
    fn test_collects_every_step_violation() {
        // 'X' is out of range for the 6-entry TileMap; '?' is unknown
        let mut container = valid_container();
        container.parts.call_strings.insert(1, "#X?.".to_string());
        let violations = container.validate();
        assert_eq!(violations.len(), 2);
        assert!(matches!(violations[0], Violation::PositionOutOfRange { position: 23, .. }));
        assert!(matches!(violations[1], Violation::UnknownCharacter { ch: '?', .. }));
    }

    #[test]
    fn test_overflow_violations() {
        let mut container = valid_container();
        container.parts.overflow.insert("1:0".to_string(), 1);
        container.parts.overflow.insert("0:1".to_string(), 1);
        container.parts.overflow.insert("9:0".to_string(), 1);
        container
            .parts
            .final_overflow
            .insert("zz".to_string(), AnnotationRecord::new("message", ""));

        let violations = container.validate();
        assert!(violations.contains(&Violation::OverflowAmbiguous { path: 1, step: 0 }));
        let orphans: Vec<&str> = violations
            .iter()
            .filter_map(|v| match v {
                Violation::OrphanOverflow { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(orphans, vec!["0:1", "9:0", "zz"]);

        let quiet = container.validate_with(&ValidationConfig {
            check_orphans: false,
            ..ValidationConfig::default()
        });
        assert_eq!(quiet, vec![Violation::OverflowAmbiguous { path: 1, step: 0 }]);
    }

    #[test]
    fn test_missing_overflow() {
        let mut container = valid_container();
        container.parts.overflow.clear();
        assert_eq!(
            container.validate(),
            vec![Violation::OverflowMissing { path: 0, step: 2 }]
        );
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut container = valid_container();
        container.parts.declared_checksum = Some(container.library().checksum().to_string());
        assert!(container.validate().is_empty());

        container.parts.declared_checksum = Some("0".repeat(32));
        assert!(matches!(
            container.validate().as_slice(),
            [Violation::TileMapChecksumMismatch { .. }]
        ));
        let unchecked = container.validate_with(&ValidationConfig {
            verify_checksum: false,
            ..ValidationConfig::default()
        });
        assert!(unchecked.is_empty());
    }

    #[test]
    fn test_hom_policy_and_reference() {
        let tile_map: TileMap = decode_table("_.1:0;x.1:0").unwrap();
        let library = Arc::new(TileLibrary::new(tile_map, CharIndex::default()).unwrap());
        let container = GenomeContainer::new(library, vec![2]);

        let tolerant = container.validate();
        assert_eq!(tolerant, vec![Violation::ReferenceEntryMissing]);

        let strict = container.validate_with(&ValidationConfig::strict());
        assert_eq!(
            strict,
            vec![
                Violation::ReferenceEntryMissing,
                Violation::HomAllelesDiverge { position: 0 }
            ]
        );
    }

    #[test]
    fn test_validate_all() {
        let mut broken = valid_container();
        broken.parts.total_steps = 0;
        let results = validate_all(&[valid_container(), broken], &ValidationConfig::default());
        assert_eq!(results.len(), 2);
        assert!(results[0].is_empty());
        assert_eq!(results[1].len(), 1);
    }
}
