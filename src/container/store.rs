//! Persisted container format: a `#!cgf` header line followed by a JSON document.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::codec::key::{decode_table, KeyError};
use crate::container::genome::{
    cumulative_steps, ContainerMetadata, ContainerParts, GenomeContainer, CGF_VERSION,
};
use crate::core::char_index::{AlphabetConfig, AlphabetError, CharIndex};
use crate::core::library::{LibraryError, TileLibrary};
use crate::core::overflow::{FinalOverflowMap, OverflowMap};
use crate::core::tile_map::{TileMap, TileMapEntry, TileMapRecord};
use crate::utils::validation::{check_geometry_limits, is_valid_md5, tile_map_checksum};

/// Magic prefix of the first line
pub const CGF_MAGIC: &str = "#!cgf";

/// Header line written before the JSON document
pub const CGF_HEADER: &str = "#!cgf a";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing or invalid header line (expected '{CGF_MAGIC} ...')")]
    Header,

    #[error("Invalid call string key '{0}' (expected lowercase hex path)")]
    PathKey(String),

    #[error("Container has neither EncodedTileMap nor TileMap")]
    MissingTileMap,

    #[error("Invalid TileMap record at position {position}: {reason}")]
    TileMapRecord { position: usize, reason: String },

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Alphabet(#[from] AlphabetError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("EncodedTileMapMd5Sum '{0}' is not 32 lowercase hex digits")]
    Checksum(String),

    #[error("Container was encoded against a different tile library: {0}")]
    LibraryMismatch(String),

    #[error("Container exceeds limits: {0}")]
    Limits(String),
}

/// Options applied when reading a container
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub alphabet: AlphabetConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CgfDocument {
    #[serde(rename = "CGFVersion")]
    cgf_version: String,
    #[serde(default)]
    encoding: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    tile_library_version: String,

    path_count: usize,
    step_per_path: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    step_per_path_sum: Option<Vec<usize>>,
    total_step: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    encoded_tile_map: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encoded_tile_map_md5_sum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tile_map: Option<Vec<TileMapRecord>>,

    char_map: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    canonical_char_map: Option<String>,

    #[serde(rename = "ABV")]
    abv: BTreeMap<String, String>,
    #[serde(default)]
    overflow_map: OverflowMap,
    #[serde(default)]
    final_overflow_map: FinalOverflowMap,
}

impl CgfDocument {
    fn parse(text: &str) -> Result<Self, StoreError> {
        let (header, body) = text.split_once('\n').unwrap_or((text, ""));
        if !header.trim_end().starts_with(CGF_MAGIC) {
            return Err(StoreError::Header);
        }
        let doc: Self = serde_json::from_str(body)?;
        if let Some(msg) = check_geometry_limits(&doc.step_per_path) {
            return Err(StoreError::Limits(msg));
        }
        if let Some(declared) = &doc.encoded_tile_map_md5_sum {
            if !is_valid_md5(declared) {
                return Err(StoreError::Checksum(declared.clone()));
            }
        }
        if let (Some(declared), Some(encoded)) = (&doc.encoded_tile_map_md5_sum, &doc.encoded_tile_map) {
            let computed = tile_map_checksum(encoded);
            if *declared != computed {
                warn!("EncodedTileMapMd5Sum {declared} does not match the TileMap ({computed})");
            }
        }
        if doc.cgf_version != CGF_VERSION {
            warn!(
                "Container version {} differs from {CGF_VERSION}",
                doc.cgf_version
            );
        }
        Ok(doc)
    }

    fn tile_map(&self) -> Result<TileMap, StoreError> {
        if let Some(encoded) = &self.encoded_tile_map {
            return Ok(decode_table(encoded)?);
        }
        let records = self.tile_map.as_ref().ok_or(StoreError::MissingTileMap)?;
        records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                TileMapEntry::try_from(record.clone())
                    .map_err(|reason| StoreError::TileMapRecord { position, reason })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(TileMap::from)
    }

    /// Checksum of the tile map as persisted, preferring the declared value
    fn tile_map_checksum(&self) -> Result<String, StoreError> {
        if let Some(declared) = &self.encoded_tile_map_md5_sum {
            return Ok(declared.clone());
        }
        if let Some(encoded) = &self.encoded_tile_map {
            return Ok(tile_map_checksum(encoded));
        }
        let library = TileLibrary::new(self.tile_map()?, CharIndex::default())?;
        Ok(library.checksum().to_string())
    }

    fn char_index(&self, options: &StoreOptions) -> Result<CharIndex, StoreError> {
        Ok(CharIndex::from_table(
            &self.char_map,
            self.canonical_char_map.as_deref(),
            &options.alphabet,
        )?)
    }

    fn into_container(self, library: Arc<TileLibrary>) -> Result<GenomeContainer, StoreError> {
        let call_strings = self
            .abv
            .into_iter()
            .map(|(key, calls)| {
                let valid = !key.is_empty()
                    && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
                match usize::from_str_radix(&key, 16) {
                    Ok(path) if valid => Ok((path, calls)),
                    _ => Err(StoreError::PathKey(key)),
                }
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let cumulative_steps_per_path = self
            .step_per_path_sum
            .unwrap_or_else(|| cumulative_steps(&self.step_per_path));

        let parts = ContainerParts {
            metadata: ContainerMetadata {
                cgf_version: self.cgf_version,
                encoding: self.encoding,
                notes: self.notes,
                tile_library_version: self.tile_library_version,
            },
            path_count: self.path_count,
            steps_per_path: self.step_per_path,
            cumulative_steps_per_path,
            total_steps: self.total_step,
            call_strings,
            overflow: self.overflow_map,
            final_overflow: self.final_overflow_map,
            declared_checksum: self.encoded_tile_map_md5_sum,
            encoded_tile_map: self.encoded_tile_map,
        };

        debug!(
            "Loaded container: {} paths, {} steps",
            parts.path_count, parts.total_steps
        );
        Ok(GenomeContainer::from_parts(library, parts))
    }
}

fn read_text(path: &Path) -> Result<String, StoreError> {
    let file = File::open(path)?;
    let mut text = String::new();
    if path.extension().is_some_and(|ext| ext == "gz") {
        GzDecoder::new(file).read_to_string(&mut text)?;
    } else {
        BufReader::new(file).read_to_string(&mut text)?;
    }
    Ok(text)
}

impl GenomeContainer {
    /// Parse a container with its own tile library.
    ///
    /// Geometry and the declared checksum are taken as persisted; run
    /// [`GenomeContainer::validate`] to check them.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the header, JSON, TileMap, alphabet or call
    /// string keys cannot be read.
    pub fn from_cgf_str(text: &str, options: &StoreOptions) -> Result<Self, StoreError> {
        let doc = CgfDocument::parse(text)?;
        let char_index = doc.char_index(options)?;
        let library = TileLibrary::new(doc.tile_map()?, char_index)?
            .with_version(doc.tile_library_version.clone());
        doc.into_container(Arc::new(library))
    }

    /// Parse a container against an already-loaded tile library.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LibraryMismatch` if the container's TileMap
    /// checksum or alphabet differs from the library's, plus any error from
    /// [`GenomeContainer::from_cgf_str`].
    pub fn from_cgf_str_with_library(
        text: &str,
        library: Arc<TileLibrary>,
        options: &StoreOptions,
    ) -> Result<Self, StoreError> {
        let doc = CgfDocument::parse(text)?;

        let checksum = doc.tile_map_checksum()?;
        if checksum != library.checksum() {
            return Err(StoreError::LibraryMismatch(format!(
                "TileMap checksum {checksum} != {}",
                library.checksum()
            )));
        }
        if doc.char_index(options)? != *library.char_index() {
            return Err(StoreError::LibraryMismatch(
                "CharMap differs from the library alphabet".to_string(),
            ));
        }

        doc.into_container(library)
    }

    /// Load a container from a file (`.gz` is decompressed).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file cannot be read, plus any error from
    /// [`GenomeContainer::from_cgf_str`].
    pub fn load_from_file(path: &Path, options: &StoreOptions) -> Result<Self, StoreError> {
        Self::from_cgf_str(&read_text(path)?, options)
    }

    /// Load a container from a file against a shared tile library.
    ///
    /// # Errors
    ///
    /// See [`GenomeContainer::from_cgf_str_with_library`].
    pub fn load_from_file_with_library(
        path: &Path,
        library: Arc<TileLibrary>,
        options: &StoreOptions,
    ) -> Result<Self, StoreError> {
        Self::from_cgf_str_with_library(&read_text(path)?, library, options)
    }

    /// Serialize with the library's canonical encoded TileMap and checksum.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Json` if serialization fails.
    pub fn to_cgf_string(&self) -> Result<String, StoreError> {
        let library = self.library();
        let metadata = self.metadata();
        let char_index = library.char_index();

        let doc = CgfDocument {
            cgf_version: metadata.cgf_version.clone(),
            encoding: metadata.encoding.clone(),
            notes: metadata.notes.clone(),
            tile_library_version: metadata.tile_library_version.clone(),
            path_count: self.path_count(),
            step_per_path: self.steps_per_path().to_vec(),
            step_per_path_sum: Some(self.cumulative_steps_per_path().to_vec()),
            total_step: self.total_steps(),
            encoded_tile_map: Some(library.encoded_tile_map().to_string()),
            encoded_tile_map_md5_sum: Some(library.checksum().to_string()),
            tile_map: None,
            char_map: char_index.to_table(),
            canonical_char_map: Some(char_index.canonical_string()),
            abv: self
                .call_strings()
                .iter()
                .map(|(path, calls)| (format!("{path:x}"), calls.clone()))
                .collect(),
            overflow_map: self.overflow_map().clone(),
            final_overflow_map: self.final_overflow_map().clone(),
        };

        let json = serde_json::to_string_pretty(&doc)?;
        Ok(format!("{CGF_HEADER}\n{json}\n"))
    }

    /// Write the container to a file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` or `StoreError::Json` on failure.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        std::fs::write(path, self.to_cgf_string()?)?;
        Ok(())
    }
}
