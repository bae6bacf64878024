use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::codec::key::encode_entry;
use crate::container::genome::Call;
use crate::container::store::StoreOptions;
use crate::container::GenomeContainer;

#[derive(Args)]
pub struct ResolveArgs {
    /// Container file (`.gz` is decompressed)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Path index (hex)
    #[arg(required = true, value_parser = parse_hex)]
    pub path: usize,

    /// Step index (hex)
    #[arg(required = true, value_parser = parse_hex)]
    pub step: usize,
}

fn parse_hex(s: &str) -> Result<usize, String> {
    usize::from_str_radix(s, 16).map_err(|e| format!("invalid hex index '{s}': {e}"))
}

/// Execute resolve subcommand
///
/// # Errors
///
/// Returns an error if the container cannot be loaded or the call does not resolve.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ResolveArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let container = GenomeContainer::load_from_file(&args.input, &StoreOptions::default())?;
    let (path, step) = (args.path, args.step);

    let call = container.resolve_call(path, step)?;
    if verbose {
        eprintln!("{path:x}:{step:x} resolved to {call:?}");
    }

    let (kind, detail) = match call {
        Call::Position(position) => {
            let key = container
                .library()
                .tile_map()
                .get(position)
                .map(encode_entry)
                .unwrap_or_default();
            ("position", serde_json::json!({ "position": position, "key": key }))
        }
        Call::NoCall(sentinel) => ("no-call", serde_json::json!({ "sentinel": sentinel.to_string() })),
        Call::Annotation(record) => ("annotation", serde_json::to_value(record)?),
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "path": path,
                "step": step,
                "call": kind,
                "detail": detail,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text | OutputFormat::Tsv => {
            println!("{path:x}:{step:x}\t{kind}\t{detail}");
        }
    }
    Ok(())
}
