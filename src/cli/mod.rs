//! Command-line interface for cgf.
//!
//! Available commands:
//!
//! - **check**: Validate a container and report every violation
//! - **peek**: Show call strings, tile ids, or path lengths
//! - **tilemap**: Encode or decode TileMap keys
//! - **resolve**: Resolve the call at one (path, step)
//!
//! ## Usage
//!
//! ```text
//! # Validate a container
//! cgf check sample.cgf
//!
//! # Raw calls for steps 0x10..0x20 of path 0x2fb
//! cgf peek abv sample.cgf --path 2fb --step 10-20 --hex
//!
//! # Decode an encoded TileMap as JSON
//! cgf tilemap decode "_.0:0;x.1:0" --format json
//! ```

use clap::{Parser, Subcommand};

pub mod check;
pub mod peek;
pub mod resolve;
pub mod tilemap;

#[derive(Parser)]
#[command(name = "cgf")]
#[command(version)]
#[command(about = "Inspect and validate compact genome format containers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a container
    Check(check::CheckArgs),

    /// Show parts of a container
    Peek(peek::PeekArgs),

    /// Encode or decode TileMap keys
    Tilemap(tilemap::TilemapArgs),

    /// Resolve the call at one path and step
    Resolve(resolve::ResolveArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Execute the parsed command
///
/// # Errors
///
/// Returns any error from the selected subcommand.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Check(args) => check::run(args, cli.format, cli.verbose),
        Commands::Peek(args) => peek::run(args, cli.format, cli.verbose),
        Commands::Tilemap(args) => tilemap::run(args, cli.format, cli.verbose),
        Commands::Resolve(args) => resolve::run(args, cli.format, cli.verbose),
    }
}
