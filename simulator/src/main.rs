use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use shared::{
    Broadcast, ConfigError, ConsistencyError, CondvarBroadcast, RunOutcome, SemaphoreBroadcast,
};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod generate;
pub mod processes;
pub mod sink;
pub mod source;
pub mod threads;

use cli::{Args, Backend, Command, RunArgs, Strategy};
use sink::SimOut;

#[derive(Debug, Error)]
enum RunFailure {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("run finished with {} inconsistencies", .0.len())]
    Inconsistent(Vec<ConsistencyError>),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunFailure {
    fn code(&self) -> u8 {
        match self {
            RunFailure::Config(_) => 2,
            RunFailure::Inconsistent(errors) => {
                let writers = errors
                    .iter()
                    .any(|e| matches!(e, ConsistencyError::WriterTotal { .. }));
                let readers = errors
                    .iter()
                    .any(|e| matches!(e, ConsistencyError::ReaderCount { .. }));
                match (writers, readers) {
                    (true, true) => 5,
                    (true, false) => 3,
                    _ => 4,
                }
            }
            RunFailure::Other(_) => 1,
        }
    }

    fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Generate(generate) => match generate::write_data_file(&generate) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e:#}");
                ExitCode::FAILURE
            }
        },
        Command::Run(run) => match simulate(&run) {
            Ok(()) => {
                info!("Completed successfully.");
                ExitCode::SUCCESS
            }
            Err(failure) => {
                error!("{failure:#}");
                failure.exit_code()
            }
        },
    }
}

fn simulate(run: &RunArgs) -> Result<(), RunFailure> {
    let config = run.config();
    config.validate()?;

    let available = source::count_values(&run.data)
        .with_context(|| format!("reading {}", run.data.display()))?;
    if available < config.total_elements {
        return Err(ConfigError::ShortInput {
            available,
            required: config.total_elements,
        }
        .into());
    }

    let sink = SimOut::new(&run.out);
    sink.clear();

    info!(
        readers = config.reader_count,
        writers = config.writer_count,
        slots = config.slots,
        elements = config.total_elements,
        backend = ?run.backend,
        notify = ?run.notify,
        "starting run"
    );

    let outcome = match run.notify {
        Strategy::Condvar => dispatch::<CondvarBroadcast>(run, &sink)?,
        Strategy::Semaphore => dispatch::<SemaphoreBroadcast>(run, &sink)?,
    };

    if let Some(path) = &run.results {
        if let Err(e) = sink::write_results(path, &outcome) {
            warn!(path = %path.display(), "failed to write results: {e}");
        }
    }

    let errors = outcome.verify(config.total_elements);
    for e in &errors {
        error!("{e}");
    }
    if !errors.is_empty() {
        return Err(RunFailure::Inconsistent(errors));
    }

    info!(
        written = outcome.total_written(),
        readers = outcome.readers.len(),
        "all values delivered"
    );
    Ok(())
}

fn dispatch<B: Broadcast>(run: &RunArgs, sink: &SimOut) -> anyhow::Result<RunOutcome> {
    let config = run.config();
    match run.backend {
        Backend::Threads => threads::run::<B>(config, &run.data, sink),
        Backend::Processes => processes::run::<B>(config, &run.data, sink),
    }
}

#[cfg(test)]
mod test {
    use anyhow::anyhow;
    use shared::{ConfigError, ConsistencyError};

    use super::RunFailure;

    fn writer_total() -> ConsistencyError {
        ConsistencyError::WriterTotal {
            expected: 10,
            actual: 9,
        }
    }

    fn reader_count(reader: u32) -> ConsistencyError {
        ConsistencyError::ReaderCount {
            reader,
            expected: 10,
            actual: 7,
        }
    }

    #[test]
    fn config_and_other_failures() {
        assert_eq!(RunFailure::from(ConfigError::NoReaders).code(), 2);
        assert_eq!(RunFailure::from(anyhow!("fork failed")).code(), 1);
    }

    #[test]
    fn inconsistencies_map_to_distinct_codes() {
        let code = |errors| RunFailure::Inconsistent(errors).code();
        assert_eq!(code(vec![writer_total()]), 3);
        assert_eq!(code(vec![reader_count(0)]), 4);
        assert_eq!(code(vec![reader_count(0), reader_count(2)]), 4);
        assert_eq!(code(vec![reader_count(1), writer_total()]), 5);
        assert_eq!(code(vec![writer_total(), reader_count(0), reader_count(1)]), 5);
    }
}
