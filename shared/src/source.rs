use crate::{error::SourceError, Value};

/// Called under the write serialization, so across all writers each
/// `sequence` is requested once and in increasing order.
pub trait ValueSource {
    fn fetch(&mut self, sequence: u64) -> Result<Value, SourceError>;
}

impl ValueSource for &[Value] {
    fn fetch(&mut self, sequence: u64) -> Result<Value, SourceError> {
        usize::try_from(sequence)
            .ok()
            .and_then(|i| self.get(i))
            .copied()
            .ok_or(SourceError::Exhausted { sequence })
    }
}
