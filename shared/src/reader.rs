use std::thread;

use tracing::{debug, info};

use crate::{notify::Broadcast, report::WorkerReport, state::SharedState, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumed {
    pub slot: usize,
    pub sequence: u64,
    pub value: Value,
    /// Readers that still owe a read of this value afterwards
    pub remaining: u32,
}

/// One consumer. Walks the buffer in order and reads every published value
/// exactly once.
pub struct Reader {
    id: u32,
    position: usize,
    consumed: u64,
    seen: Vec<Option<u64>>,
}

impl Reader {
    pub fn new(id: u32, slots: usize) -> Self {
        Self {
            id,
            position: 0,
            consumed: 0,
            seen: vec![None; slots],
        }
    }

    pub fn run<B: Broadcast>(self, state: &SharedState<B>) -> WorkerReport {
        self.run_observed(state, |_| {})
    }

    pub fn run_observed<B: Broadcast>(
        mut self,
        state: &SharedState<B>,
        mut observe: impl FnMut(Consumed),
    ) -> WorkerReport {
        assert_eq!(self.seen.len(), state.config.slots);

        let pause = state.config.reader_sleep;
        while self.consumed < state.config.total_elements {
            observe(self.step(state));
            if !pause.is_zero() {
                thread::sleep(pause);
            }
        }

        info!(reader = self.id, consumed = self.consumed, "reader finished");
        WorkerReport::reader(self.id, self.consumed)
    }

    fn step<B: Broadcast>(&mut self, state: &SharedState<B>) -> Consumed {
        let slot = self.position;
        // In-order consumption means the next value wanted is exactly the
        // number already consumed.
        let sequence = self.consumed;

        let mut ledger = state.ledger.lock();
        while !ledger.is_ready(slot, sequence) {
            let ticket = state.new_value.register();
            drop(ledger);
            state.new_value.wait(ticket);
            ledger = state.ledger.lock();
        }
        drop(ledger);

        // The previous visit to this slot was exactly one lap ago.
        assert_eq!(
            self.seen[slot],
            sequence.checked_sub(state.config.slots as u64),
            "reader {} out of step at slot {slot} before value #{sequence}",
            self.id
        );

        let group = state.group.join();

        let Some(value) = group.load(slot) else {
            panic!("slot {slot} is armed but was never written");
        };
        self.seen[slot] = Some(sequence);
        self.consumed += 1;
        let remaining = state.ledger.lock().consume(slot);

        drop(group);
        state.slot_free.notify_all();

        debug!(
            reader = self.id,
            read = self.consumed,
            value,
            slot,
            remaining,
            "consumed"
        );

        self.position = (slot + 1) % state.config.slots;
        Consumed {
            slot,
            sequence,
            value,
            remaining,
        }
    }
}
