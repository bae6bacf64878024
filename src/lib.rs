//! # cgf
//!
//! Compact genome format: a genome is stored as one short string of
//! characters per path, where each character names a tile variant call in a
//! shared TileMap.
//!
//! A TileMap is an ordered list of unique (zygosity class, per-allele variant
//! groups) entries; position 0 is the reference. A dense single-character
//! alphabet covers the first positions. Calls the alphabet cannot express are
//! escaped into a sparse overflow map, and calls with no TileMap entry at all
//! into a terminal annotation map.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cgf::{Call, CharIndex, GenomeBuilder, TileLibrary, ZygosityClass};
//! use cgf::codec::key::decode_table;
//!
//! let tile_map = decode_table("_.0:0;x.1:0;x.0:1").unwrap();
//! let library = Arc::new(TileLibrary::new(tile_map, CharIndex::default()).unwrap());
//!
//! let mut builder = GenomeBuilder::new(library, vec![4]).unwrap();
//! builder
//!     .add_call(0, 1, ZygosityClass::HET, &[vec![1], vec![0]], &[vec![1], vec![1]])
//!     .unwrap();
//! let genome = builder.finish();
//!
//! assert_eq!(genome.call_string(0), Some("-B--"));
//! assert_eq!(genome.resolve_call(0, 1), Ok(Call::Position(1)));
//! assert!(genome.validate().is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`core`]: TileMap, alphabet, overflow tiers and the shared tile library
//! - [`codec`]: Compact textual TileMap keys
//! - [`container`]: Per-genome containers, persistence and validation
//! - [`utils`]: Limits and range parsing
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod codec;
pub mod container;
pub mod core;
pub mod utils;

// Re-export commonly used types for convenience
pub use container::{Call, GenomeBuilder, GenomeContainer, LookupError, ValidationConfig, Violation};
pub use crate::core::char_index::{AlphabetConfig, CharIndex};
pub use crate::core::library::TileLibrary;
pub use crate::core::tile_map::{TileMap, TileMapEntry, VariantGroup};
pub use crate::core::types::*;
