use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use shared::{Role, RunOutcome, WorkerReport};
use tracing::warn;

// One `write` per line on an `O_APPEND` descriptor, shared by threads and
// forked children alike. Failures are only logged.
#[derive(Debug, Clone)]
pub struct SimOut {
    path: PathBuf,
}

impl SimOut {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn clear(&self) {
        if let Err(e) = File::create(&self.path) {
            warn!(path = %self.path.display(), "failed to clear completion log: {e}");
        }
    }

    pub fn record(&self, report: &WorkerReport) {
        if let Err(e) = self.append(report) {
            warn!(path = %self.path.display(), "failed to log completion: {e}");
        }
    }

    fn append(&self, report: &WorkerReport) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = format!("{}\n", completion_line(report));
        file.write_all(line.as_bytes())
    }
}

pub fn completion_line(report: &WorkerReport) -> String {
    let (action, dest) = match report.role {
        Role::Reader => ("reading", "from"),
        Role::Writer => ("writing", "to"),
    };
    format!(
        "{}-{} has finished {action} {} pieces of data {dest} the data_buffer.",
        report.role, report.id, report.items
    )
}

pub fn write_results(path: &Path, outcome: &RunOutcome) -> csv::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for report in outcome.readers.iter().chain(&outcome.writers) {
        writer.serialize(report)?;
    }
    writer.flush()?;
    Ok(())
}
