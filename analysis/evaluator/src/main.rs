use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use clap::Parser;
use shared::{RunOutcome, WorkerReport};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Re-checks a finished run from its results CSV
#[derive(Debug, Parser)]
struct Args {
    /// CSV written by `simulator run --results`
    results: PathBuf,
    /// Values the run was supposed to transfer
    #[arg(long)]
    elements: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let outcome = match load_csv(&args.results) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    println!("--- Summary ---");
    println!();
    println!(
        "{} writers published {} of {} values",
        outcome.writers.len(),
        outcome.total_written(),
        args.elements
    );
    for writer in &outcome.writers {
        println!("  writer-{}: {}", writer.id, writer.items);
    }
    println!("{} readers", outcome.readers.len());
    for reader in &outcome.readers {
        println!("  reader-{}: {}", reader.id, reader.items);
    }
    println!();

    let errors = outcome.verify(args.elements);
    if errors.is_empty() {
        println!("consistent");
        return ExitCode::SUCCESS;
    }
    for e in &errors {
        println!("inconsistent: {e}");
    }
    ExitCode::FAILURE
}

fn load_csv(path: &Path) -> anyhow::Result<RunOutcome> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let reports: Result<Vec<WorkerReport>, _> = reader.deserialize().collect();
    Ok(reports?.into_iter().collect())
}
