//! Two-tier sparse overflow for calls the dense alphabet cannot express.
//!
//! Both tiers are keyed by `hex(path):hex(step)`. The first tier maps to a
//! TileMap position (the alphabet had no character to spare); the second,
//! terminal tier maps to an opaque annotation for calls with no TileMap entry.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::types::TilePosition;

/// Overflow tier 1: key -> TileMap position
pub type OverflowMap = BTreeMap<String, TilePosition>;

/// Overflow tier 2: key -> annotation
pub type FinalOverflowMap = BTreeMap<String, AnnotationRecord>;

/// `(path, step)` address rendered as lowercase hex joined by `:`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverflowKey {
    pub path: usize,
    pub step: usize,
}

impl OverflowKey {
    #[must_use]
    pub fn new(path: usize, step: usize) -> Self {
        Self { path, step }
    }
}

impl std::fmt::Display for OverflowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:x}:{:x}", self.path, self.step)
    }
}

impl FromStr for OverflowKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, step) = s
            .split_once(':')
            .ok_or_else(|| format!("overflow key '{s}' has no ':' separator"))?;
        Ok(Self::new(parse_hex_field(s, path)?, parse_hex_field(s, step)?))
    }
}

fn parse_hex_field(key: &str, field: &str) -> Result<usize, String> {
    if field.is_empty() || !field.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(format!("overflow key '{key}' is not lowercase hex"));
    }
    usize::from_str_radix(field, 16).map_err(|e| format!("overflow key '{key}': {e}"))
}

/// Opaque record for a call with no TileMap entry (e.g. a FastJ block or a message)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Data")]
    pub payload: String,
}

impl AnnotationRecord {
    pub fn new(kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }
}

/// Outcome of an overflow lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowResolution<'a> {
    Position(TilePosition),
    Annotation(&'a AnnotationRecord),
    Missing,
}

/// Read-only view over both overflow tiers of one container
#[derive(Debug, Clone, Copy)]
pub struct OverflowResolver<'a> {
    overflow: &'a OverflowMap,
    final_overflow: &'a FinalOverflowMap,
}

impl<'a> OverflowResolver<'a> {
    pub fn new(overflow: &'a OverflowMap, final_overflow: &'a FinalOverflowMap) -> Self {
        Self {
            overflow,
            final_overflow,
        }
    }

    /// Look up tier 1, then tier 2
    #[must_use]
    pub fn resolve(&self, path: usize, step: usize) -> OverflowResolution<'a> {
        let key = OverflowKey::new(path, step).to_string();
        if let Some(&pos) = self.overflow.get(&key) {
            return OverflowResolution::Position(pos);
        }
        match self.final_overflow.get(&key) {
            Some(record) => OverflowResolution::Annotation(record),
            None => OverflowResolution::Missing,
        }
    }

    #[must_use]
    pub fn has_position(&self, path: usize, step: usize) -> bool {
        self.overflow
            .contains_key(&OverflowKey::new(path, step).to_string())
    }

    #[must_use]
    pub fn has_annotation(&self, path: usize, step: usize) -> bool {
        self.final_overflow
            .contains_key(&OverflowKey::new(path, step).to_string())
    }
}
