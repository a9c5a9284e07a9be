use std::thread;

use tracing::{debug, info};

use crate::{
    error::SourceError, notify::Broadcast, report::WorkerReport, source::ValueSource,
    state::SharedState,
};

/// One producer. Writers cooperate on a single sequence of values: whoever
/// holds the write serialization publishes the next value into the next
/// slot.
pub struct Writer<S> {
    id: u32,
    source: S,
    published: u64,
}

impl<S: ValueSource> Writer<S> {
    pub fn new(id: u32, source: S) -> Self {
        Self {
            id,
            source,
            published: 0,
        }
    }

    pub fn run<B: Broadcast>(mut self, state: &SharedState<B>) -> Result<WorkerReport, SourceError> {
        let pause = state.config.writer_sleep;
        while !self.step(state)? {
            if !pause.is_zero() {
                thread::sleep(pause);
            }
        }

        info!(writer = self.id, published = self.published, "writer finished");
        Ok(WorkerReport::writer(self.id, self.published))
    }

    fn step<B: Broadcast>(&mut self, state: &SharedState<B>) -> Result<bool, SourceError> {
        let target = state.config.total_elements;

        let mut writer = state.writer.lock();
        if writer.total_writes >= target {
            return Ok(true);
        }

        let mut ledger = state.ledger.lock();
        while !ledger.is_free(writer.cursor) {
            let ticket = state.slot_free.register();
            drop(ledger);
            drop(writer);

            state.slot_free.wait(ticket);

            writer = state.writer.lock();
            if writer.total_writes >= target {
                return Ok(true);
            }
            ledger = state.ledger.lock();
        }
        // Only a publish can re-arm the slot and we hold the serialization.
        drop(ledger);

        let mut cells = state.group.lock_exclusive();

        let slot = writer.cursor;
        let sequence = writer.total_writes;
        let value = self.source.fetch(sequence)?;

        cells.store(slot, value);
        state.ledger.lock().publish(slot, sequence);

        writer.total_writes += 1;
        writer.cursor = (slot + 1) % state.config.slots;
        self.published += 1;

        debug!(
            writer = self.id,
            own = self.published,
            total = writer.total_writes,
            value,
            slot,
            "published"
        );

        drop(cells);
        let done = writer.total_writes >= target;
        drop(writer);

        state.new_value.notify_all();
        Ok(done)
    }
}
