use std::time::Duration;

use crate::{error::ConfigError, shm::ShmSafe, MAX_SLOTS, MAX_WORKERS};

/// Run parameters. Fixed once the first worker starts.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub reader_count: u32,
    pub writer_count: u32,
    pub reader_sleep: Duration,
    pub writer_sleep: Duration,
    /// Values produced in total, and consumed by each reader
    pub total_elements: u64,
    pub slots: usize,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reader_count == 0 {
            return Err(ConfigError::NoReaders);
        }
        if self.writer_count == 0 {
            return Err(ConfigError::NoWriters);
        }
        if self.total_elements == 0 {
            return Err(ConfigError::NoElements);
        }
        if self.slots == 0 || self.slots > MAX_SLOTS {
            return Err(ConfigError::SlotCount {
                slots: self.slots,
                max: MAX_SLOTS,
            });
        }
        let workers = self.reader_count as usize + self.writer_count as usize;
        if workers > MAX_WORKERS {
            return Err(ConfigError::TooManyWorkers {
                workers,
                max: MAX_WORKERS,
            });
        }
        Ok(())
    }
}

unsafe impl ShmSafe for Config {}
