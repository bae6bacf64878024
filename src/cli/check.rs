use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::container::store::StoreOptions;
use crate::container::validate::{HomPolicy, ValidationConfig, Violation};
use crate::container::GenomeContainer;

#[derive(Args)]
pub struct CheckArgs {
    /// Container file(s) (`.gz` is decompressed)
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Report homozygous TileMap entries whose alleles differ
    #[arg(long)]
    pub strict_hom: bool,

    /// Skip the EncodedTileMapMd5Sum check
    #[arg(long)]
    pub skip_checksum: bool,

    /// Skip the orphan overflow key check
    #[arg(long)]
    pub skip_orphans: bool,
}

/// Execute check subcommand
///
/// # Errors
///
/// Returns an error if a container cannot be loaded or any container has violations.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: CheckArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = ValidationConfig {
        hom_policy: if args.strict_hom {
            HomPolicy::Strict
        } else {
            HomPolicy::Tolerate
        },
        verify_checksum: !args.skip_checksum,
        check_orphans: !args.skip_orphans,
    };

    let containers = args
        .inputs
        .iter()
        .map(|path| {
            GenomeContainer::load_from_file(path, &StoreOptions::default())
                .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if verbose {
        eprintln!("Loaded {} container(s)", containers.len());
    }

    let results = crate::container::validate::validate_all(&containers, &config);

    match format {
        OutputFormat::Text => print_text(&args.inputs, &results),
        OutputFormat::Json => print_json(&args.inputs, &results)?,
        OutputFormat::Tsv => print_tsv(&args.inputs, &results),
    }

    let failed = results.iter().filter(|v| !v.is_empty()).count();
    if failed > 0 {
        anyhow::bail!("{failed} container(s) failed validation");
    }
    Ok(())
}

fn print_text(inputs: &[PathBuf], results: &[Vec<Violation>]) {
    for (path, violations) in inputs.iter().zip(results) {
        if violations.is_empty() {
            println!("{}: ok", path.display());
            continue;
        }
        println!("{}: {} violation(s)", path.display(), violations.len());
        for violation in violations {
            println!("  {violation}");
        }
    }
}

fn print_json(inputs: &[PathBuf], results: &[Vec<Violation>]) -> anyhow::Result<()> {
    let output: Vec<serde_json::Value> = inputs
        .iter()
        .zip(results)
        .map(|(path, violations)| {
            serde_json::json!({
                "file": path.display().to_string(),
                "ok": violations.is_empty(),
                "violations": violations,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(inputs: &[PathBuf], results: &[Vec<Violation>]) {
    println!("file\tviolation");
    for (path, violations) in inputs.iter().zip(results) {
        for violation in violations {
            println!("{}\t{violation}", path.display());
        }
    }
}
