use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::cli::OutputFormat;
use crate::codec::key::{decode_table, encode_table};
use crate::core::tile_map::{TileMap, TileMapEntry, TileMapRecord};
use crate::utils::validation::tile_map_checksum;

#[derive(Args)]
pub struct TilemapArgs {
    #[command(subcommand)]
    pub command: TilemapCommands,
}

#[derive(Subcommand)]
pub enum TilemapCommands {
    /// Decode an encoded TileMap (`;`-joined keys) into entries
    Decode {
        /// Encoded TileMap, or `@file` to read it from a file
        #[arg(required = true)]
        table: String,
    },

    /// Encode a JSON array of TileMap records into keys
    Encode {
        /// JSON file holding `[{"Type": ..., "Ploidy": ..., "Variant": ..., "VariantLength": ...}]`
        #[arg(required = true)]
        input: PathBuf,
    },
}

fn read_table(arg: &str) -> anyhow::Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(path)?.trim().to_string()),
        None => Ok(arg.to_string()),
    }
}

/// Execute tilemap subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be read, decoded, or encoded.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: TilemapArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    match args.command {
        TilemapCommands::Decode { table } => run_decode(&read_table(&table)?, format, verbose),
        TilemapCommands::Encode { input } => run_encode(&input, format, verbose),
    }
}

fn run_decode(encoded: &str, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let tile_map = decode_table(encoded)?;
    if verbose {
        eprintln!(
            "Decoded {} entries (md5 {})",
            tile_map.len(),
            tile_map_checksum(encoded)
        );
    }

    match format {
        OutputFormat::Json => {
            let records: Vec<TileMapRecord> = tile_map.iter().map(TileMapRecord::from).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Text | OutputFormat::Tsv => {
            println!("position\ttype\tvariants\tlengths");
            for (position, entry) in tile_map.iter().enumerate() {
                let record = TileMapRecord::from(entry);
                println!(
                    "{position}\t{}\t{:?}\t{:?}",
                    record.class, record.variant, record.variant_length
                );
            }
        }
    }
    Ok(())
}

fn run_encode(input: &Path, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let records: Vec<TileMapRecord> = serde_json::from_str(&std::fs::read_to_string(input)?)?;
    let entries = records
        .into_iter()
        .enumerate()
        .map(|(position, record)| {
            TileMapEntry::try_from(record)
                .map_err(|reason| anyhow::anyhow!("record {position}: {reason}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let encoded = encode_table(&TileMap::from(entries));
    let checksum = tile_map_checksum(&encoded);
    if verbose {
        eprintln!("Encoded {} bytes", encoded.len());
    }

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "EncodedTileMap": encoded,
                "EncodedTileMapMd5Sum": checksum,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => println!("{encoded}"),
        OutputFormat::Tsv => println!("{encoded}\t{checksum}"),
    }
    Ok(())
}
