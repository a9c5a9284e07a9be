use std::{io, num::ParseIntError};

use thiserror::Error;

/// Rejected before any worker is started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one reader is required")]
    NoReaders,
    #[error("at least one writer is required")]
    NoWriters,
    #[error("the number of elements to transfer must be positive")]
    NoElements,
    #[error("the buffer needs between 1 and {max} slots, got {slots}")]
    SlotCount { slots: usize, max: usize },
    #[error("at most {max} workers are supported, got {workers}")]
    TooManyWorkers { workers: usize, max: usize },
    #[error("input holds {available} values but {required} are required")]
    ShortInput { available: u64, required: u64 },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("input exhausted before value #{sequence}")]
    Exhausted { sequence: u64 },
    #[error("malformed value {token:?} in input")]
    Parse {
        token: String,
        #[source]
        source: ParseIntError,
    },
    #[error("failed to read input")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("writers published {actual} values in total, expected {expected}")]
    WriterTotal { expected: u64, actual: u64 },
    #[error("reader-{reader} consumed {actual} values, expected {expected}")]
    ReaderCount {
        reader: u32,
        expected: u64,
        actual: u64,
    },
}
