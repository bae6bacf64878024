use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::cli::OutputFormat;
use crate::container::store::StoreOptions;
use crate::container::GenomeContainer;
use crate::utils::validation::{parse_index_ranges, IndexRange};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PeekWhat {
    /// Raw call characters
    Abv,
    /// Tile ids of the calls covering each step
    Tile,
    /// Step count of each path
    Length,
}

#[derive(Args)]
pub struct PeekArgs {
    /// What to show
    #[arg(value_enum)]
    pub what: PeekWhat,

    /// Container file (`.gz` is decompressed)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Paths to show: `a`, `a-b`, `a-`, `a+n`, comma separated (default: all)
    #[arg(long)]
    pub path: Option<String>,

    /// Steps to show, same syntax as --path (default: all)
    #[arg(long)]
    pub step: Option<String>,

    /// Read --path and --step as hex
    #[arg(long)]
    pub hex: bool,

    /// Tile library version used in tile ids
    #[arg(long, default_value = "0")]
    pub library_version: u32,
}

fn ranges(spec: Option<&str>, radix: u32) -> anyhow::Result<Vec<IndexRange>> {
    match spec {
        Some(spec) => parse_index_ranges(spec, radix).map_err(anyhow::Error::msg),
        None => Ok(vec![IndexRange { start: 0, end: None }]),
    }
}

/// Execute peek subcommand
///
/// # Errors
///
/// Returns an error if the container cannot be loaded or a range is malformed.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: PeekArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let radix = if args.hex { 16 } else { 10 };
    let path_ranges = ranges(args.path.as_deref(), radix)?;
    let step_ranges = ranges(args.step.as_deref(), radix)?;

    let container = GenomeContainer::load_from_file(&args.input, &StoreOptions::default())?;
    if verbose {
        eprintln!(
            "Loaded container with {} paths, {} steps",
            container.path_count(),
            container.total_steps()
        );
    }

    let paths: Vec<usize> = path_ranges
        .iter()
        .filter_map(|r| r.bounded(container.path_count()))
        .flatten()
        .collect();

    match args.what {
        PeekWhat::Length => print_lengths(&container, &paths, format)?,
        PeekWhat::Abv => print_calls(&container, &paths, &step_ranges, format)?,
        PeekWhat::Tile => print_tiles(&container, &paths, &step_ranges, args.library_version, format)?,
    }
    Ok(())
}

fn print_lengths(container: &GenomeContainer, paths: &[usize], format: OutputFormat) -> anyhow::Result<()> {
    let steps = container.steps_per_path();
    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = paths
                .iter()
                .map(|&p| serde_json::json!({ "path": p, "steps": steps.get(p) }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text | OutputFormat::Tsv => {
            for &p in paths {
                if let Some(n) = steps.get(p) {
                    println!("{p:x}\t{n}");
                }
            }
        }
    }
    Ok(())
}

fn print_calls(
    container: &GenomeContainer,
    paths: &[usize],
    step_ranges: &[IndexRange],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for &path in paths {
        let len = container.call_string(path).map_or(0, str::len);
        for range in step_ranges.iter().filter_map(|r| r.bounded(len)) {
            let start = range.start;
            rows.push((path, start, container.call_slice(path, range)?));
        }
    }

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = rows
                .iter()
                .map(|(path, step, calls)| {
                    serde_json::json!({ "path": path, "step": step, "calls": calls })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text | OutputFormat::Tsv => {
            for (path, step, calls) in rows {
                println!("{path:x}.{step:x}\t{calls}");
            }
        }
    }
    Ok(())
}

fn print_tiles(
    container: &GenomeContainer,
    paths: &[usize],
    step_ranges: &[IndexRange],
    library_version: u32,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for &path in paths {
        let len = container.call_string(path).map_or(0, str::len);
        for step in step_ranges.iter().filter_map(|r| r.bounded(len)).flatten() {
            let ids = container.tile_ids(path, step, library_version)?;
            rows.push((path, step, ids));
        }
    }

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = rows
                .iter()
                .map(|(path, step, ids)| {
                    serde_json::json!({ "path": path, "step": step, "alleles": ids })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text | OutputFormat::Tsv => {
            for (path, step, ids) in rows {
                let alleles: Vec<String> = ids.iter().map(|a| a.join(" ")).collect();
                println!("{path:x}.{step:x}\t{}", alleles.join("\t"));
            }
        }
    }
    Ok(())
}
