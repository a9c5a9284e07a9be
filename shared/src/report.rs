use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::ConsistencyError, shm::ShmSafe};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reader,
    Writer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Reader => "reader",
            Role::Writer => "writer",
        })
    }
}

/// Final count of one worker. For a writer `items` is what it published
/// itself, for a reader what it consumed.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub role: Role,
    pub id: u32,
    pub items: u64,
}

unsafe impl ShmSafe for WorkerReport {}

impl WorkerReport {
    pub fn reader(id: u32, items: u64) -> Self {
        Self {
            role: Role::Reader,
            id,
            items,
        }
    }

    pub fn writer(id: u32, items: u64) -> Self {
        Self {
            role: Role::Writer,
            id,
            items,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct RunOutcome {
    pub readers: Vec<WorkerReport>,
    pub writers: Vec<WorkerReport>,
}

impl RunOutcome {
    pub fn total_written(&self) -> u64 {
        self.writers.iter().map(|w| w.items).sum()
    }

    pub fn verify(&self, total_elements: u64) -> Vec<ConsistencyError> {
        let mut errors = Vec::new();

        let written = self.total_written();
        if written != total_elements {
            errors.push(ConsistencyError::WriterTotal {
                expected: total_elements,
                actual: written,
            });
        }

        for reader in &self.readers {
            if reader.items != total_elements {
                errors.push(ConsistencyError::ReaderCount {
                    reader: reader.id,
                    expected: total_elements,
                    actual: reader.items,
                });
            }
        }

        errors
    }
}

impl FromIterator<WorkerReport> for RunOutcome {
    fn from_iter<I: IntoIterator<Item = WorkerReport>>(iter: I) -> Self {
        let mut outcome = RunOutcome::default();
        for report in iter {
            match report.role {
                Role::Reader => outcome.readers.push(report),
                Role::Writer => outcome.writers.push(report),
            }
        }
        outcome.readers.sort_by_key(|r| r.id);
        outcome.writers.sort_by_key(|w| w.id);
        outcome
    }
}
