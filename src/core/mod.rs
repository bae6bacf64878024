//! Core data types of the tile-variant encoding.
//!
//! - [`types`]: Zygosity classes, sentinel kinds, TileMap positions
//! - [`tile_map`]: TileMap entries and the ordered TileMap
//! - [`char_index`]: Dense character alphabet over TileMap positions
//! - [`overflow`]: Two-tier overflow for calls the alphabet cannot express
//! - [`library`]: Indexed TileMap plus alphabet, shared by many genomes

pub mod char_index;
pub mod library;
pub mod overflow;
pub mod tile_map;
pub mod types;
