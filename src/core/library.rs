use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::codec::key::{decode_table, encode_table, KeyError};
use crate::core::char_index::CharIndex;
use crate::core::tile_map::{TileMap, TileMapEntry};
use crate::core::types::TilePosition;
use crate::utils::validation::tile_map_checksum;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("TileMap entry at position {position} duplicates position {first}")]
    DuplicateEntry {
        first: TilePosition,
        position: TilePosition,
    },

    #[error("TileMap entry at position {0} has the wrong allele count, an empty allele, or a zero span")]
    MalformedEntry(TilePosition),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Immutable reference data shared by every genome encoded against one tile library.
///
/// Built once, then handed to containers behind an `Arc`; nothing in it changes
/// after construction.
#[derive(Debug)]
pub struct TileLibrary {
    tile_map: TileMap,
    char_index: CharIndex,

    /// Index: entry -> TileMap position
    entry_to_position: HashMap<TileMapEntry, TilePosition>,

    encoded: String,
    checksum: String,
    version: String,
}

impl TileLibrary {
    /// Index a TileMap against a character alphabet.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::DuplicateEntry` if two positions hold the same
    /// entry, or `LibraryError::MalformedEntry` for an ill-formed entry.
    pub fn new(tile_map: TileMap, char_index: CharIndex) -> Result<Self, LibraryError> {
        let mut entry_to_position = HashMap::with_capacity(tile_map.len());

        for (position, entry) in tile_map.iter().enumerate() {
            if !entry.is_well_formed() {
                return Err(LibraryError::MalformedEntry(position));
            }
            if let Some(&first) = entry_to_position.get(entry) {
                return Err(LibraryError::DuplicateEntry { first, position });
            }
            entry_to_position.insert(entry.clone(), position);
        }

        if tile_map.get(0) != Some(&TileMapEntry::reference()) {
            warn!("TileMap position 0 is not the reference entry");
        }

        let encoded = encode_table(&tile_map);
        let checksum = tile_map_checksum(&encoded);

        Ok(Self {
            tile_map,
            char_index,
            entry_to_position,
            encoded,
            checksum,
            version: String::new(),
        })
    }

    /// Decode an encoded TileMap and index it
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Key` if the table does not decode, or any error
    /// from [`TileLibrary::new`].
    pub fn from_encoded(encoded: &str, char_index: CharIndex) -> Result<Self, LibraryError> {
        Self::new(decode_table(encoded)?, char_index)
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn tile_map(&self) -> &TileMap {
        &self.tile_map
    }

    #[must_use]
    pub fn char_index(&self) -> &CharIndex {
        &self.char_index
    }

    /// TileMap position of an entry, by exact structural match
    #[must_use]
    pub fn position_of(&self, entry: &TileMapEntry) -> Option<TilePosition> {
        self.entry_to_position.get(entry).copied()
    }

    /// `;`-joined key form of the TileMap
    #[must_use]
    pub fn encoded_tile_map(&self) -> &str {
        &self.encoded
    }

    /// Lowercase hex md5 of [`TileLibrary::encoded_tile_map`]
    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of TileMap entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.tile_map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tile_map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tile_map::VariantGroup;
    use crate::core::types::ZygosityClass;

    fn sample_map() -> TileMap {
        TileMap::new(vec![
            TileMapEntry::reference(),
            TileMapEntry::from_parts(ZygosityClass::HET, &[vec![1], vec![0]], &[vec![1], vec![1]])
                .unwrap(),
            TileMapEntry::from_parts(ZygosityClass::HET, &[vec![0], vec![1]], &[vec![1], vec![1]])
                .unwrap(),
        ])
    }

    #[test]
    fn test_position_lookup() {
        let library = TileLibrary::new(sample_map(), CharIndex::default()).unwrap();
        assert_eq!(library.len(), 3);
        for (k, entry) in library.tile_map().iter().enumerate() {
            assert_eq!(library.position_of(entry), Some(k));
        }
        let missing =
            TileMapEntry::from_parts(ZygosityClass::HOM, &[vec![1], vec![1]], &[vec![1], vec![1]])
                .unwrap();
        assert_eq!(library.position_of(&missing), None);
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut entries = sample_map().entries().to_vec();
        entries.push(entries[1].clone());
        let err = TileLibrary::new(TileMap::new(entries), CharIndex::default()).unwrap_err();
        assert!(matches!(
            err,
            LibraryError::DuplicateEntry {
                first: 1,
                position: 3
            }
        ));
    }

    #[test]
    fn test_rejects_wrong_allele_count() {
        let mut entries = sample_map().entries().to_vec();
        entries.push(TileMapEntry::new(
            ZygosityClass::HET,
            vec![vec![VariantGroup::single(1)]],
        ));
        let err = TileLibrary::new(TileMap::new(entries), CharIndex::default()).unwrap_err();
        assert!(matches!(err, LibraryError::MalformedEntry(3)));

        let err = TileLibrary::from_encoded("_.0:0;x.1", CharIndex::default()).unwrap_err();
        assert!(matches!(err, LibraryError::Key(_)));
    }

    #[test]
    fn test_encoded_and_checksum() {
        let library = TileLibrary::new(sample_map(), CharIndex::default()).unwrap();
        assert_eq!(library.encoded_tile_map(), "_.0:0;x.1:0;x.0:1");
        assert_eq!(library.checksum().len(), 32);

        let again =
            TileLibrary::from_encoded(library.encoded_tile_map(), CharIndex::default()).unwrap();
        assert_eq!(again.checksum(), library.checksum());
        assert_eq!(again.tile_map(), library.tile_map());
    }

    #[test]
    fn test_from_encoded_propagates_key_error() {
        let err = TileLibrary::from_encoded("_.0:0;x.", CharIndex::default()).unwrap_err();
        assert!(matches!(err, LibraryError::Key(_)));
    }
}
