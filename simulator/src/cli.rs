use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use shared::Config;

/// Broadcast ring simulator
#[derive(Debug, Clone, Parser)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run readers and writers over the values in the data file
    Run(RunArgs),
    /// Write a data file of random values
    Generate(GenerateArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Number of readers
    pub readers: u32,
    /// Number of writers
    pub writers: u32,
    /// Milliseconds a reader sleeps after each read
    pub reader_sleep: u64,
    /// Milliseconds a writer sleeps after each write
    pub writer_sleep: u64,
    /// Slots in the ring buffer
    #[arg(long, default_value_t = 20)]
    pub slots: usize,
    /// Values to transfer
    #[arg(long, default_value_t = 100)]
    pub elements: u64,
    /// Whitespace separated input values
    #[arg(long, default_value = "shared_data")]
    pub data: PathBuf,
    /// Completion log, truncated at start
    #[arg(long, default_value = "sim_out")]
    pub out: PathBuf,
    #[arg(long, value_enum, default_value_t = Backend::Threads)]
    pub backend: Backend,
    #[arg(long, value_enum, default_value_t = Strategy::Condvar)]
    pub notify: Strategy,
    /// Also write per-worker counts as CSV
    #[arg(long)]
    pub results: Option<PathBuf>,
}

impl RunArgs {
    pub fn config(&self) -> Config {
        Config {
            reader_count: self.readers,
            writer_count: self.writers,
            reader_sleep: Duration::from_millis(self.reader_sleep),
            writer_sleep: Duration::from_millis(self.writer_sleep),
            total_elements: self.elements,
            slots: self.slots,
        }
    }
}

/// Where the workers run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Threads,
    Processes,
}

/// How blocked workers get woken
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    Condvar,
    Semaphore,
}

#[derive(Debug, Clone, clap::Args)]
pub struct GenerateArgs {
    #[arg(long, default_value = "shared_data")]
    pub data: PathBuf,
    #[arg(long, default_value_t = 100)]
    pub elements: u64,
    /// Largest value written, values start at 0
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(i32).range(0..))]
    pub max: i32,
    /// Seed for reproducible files
    #[arg(long)]
    pub seed: Option<u64>,
}
