use std::{
    collections::VecDeque,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use shared::{SourceError, Value, ValueSource};

/// Whitespace separated integers. Each writer owns one and skips the values
/// other writers took.
pub struct FileSource<R> {
    reader: R,
    tokens: VecDeque<String>,
    next: u64,
}

impl FileSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> FileSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            tokens: VecDeque::new(),
            next: 0,
        }
    }

    fn next_value(&mut self) -> Result<Option<Value>, SourceError> {
        let token = loop {
            if let Some(token) = self.tokens.pop_front() {
                break token;
            }
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.tokens
                .extend(line.split_whitespace().map(str::to_owned));
        };
        let value = token
            .parse()
            .map_err(|source| SourceError::Parse { token, source })?;
        Ok(Some(value))
    }
}

impl<R: BufRead> ValueSource for FileSource<R> {
    fn fetch(&mut self, sequence: u64) -> Result<Value, SourceError> {
        assert!(
            sequence >= self.next,
            "value #{sequence} requested after #{}",
            self.next
        );
        loop {
            let value = self
                .next_value()?
                .ok_or(SourceError::Exhausted { sequence })?;
            self.next += 1;
            if self.next > sequence {
                return Ok(value);
            }
        }
    }
}

pub fn count_values(path: &Path) -> Result<u64, SourceError> {
    let mut source = FileSource::open(path)?;
    let mut count = 0;
    while source.next_value()?.is_some() {
        count += 1;
    }
    Ok(count)
}
