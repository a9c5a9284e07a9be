use arrayvec::ArrayVec;

use crate::{shm::ShmSafe, MAX_SLOTS};

/// Per-slot bookkeeping: how many readers still owe a read of the value in
/// the slot, and which publish put that value there.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEntry {
    pub pending: u32,
    pub sequence: Option<u64>,
}

/// Pending-read ledger. Only ever touched under the ledger mutex.
#[repr(C)]
#[derive(Debug)]
pub struct Ledger {
    reader_count: u32,
    entries: ArrayVec<SlotEntry, MAX_SLOTS>,
}

impl Ledger {
    pub fn new(slots: usize, reader_count: u32) -> Self {
        let mut entries = ArrayVec::new();
        for _ in 0..slots {
            entries.push(SlotEntry {
                pending: 0,
                sequence: None,
            });
        }
        Self {
            reader_count,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, slot: usize) -> SlotEntry {
        self.entries[slot]
    }

    pub fn is_free(&self, slot: usize) -> bool {
        self.entries[slot].pending == 0
    }

    /// The slot holds publish number `sequence` and it has not been drained.
    pub fn is_ready(&self, slot: usize, sequence: u64) -> bool {
        let entry = &self.entries[slot];
        entry.pending > 0 && entry.sequence == Some(sequence)
    }

    pub fn is_drained(&self) -> bool {
        self.entries.iter().all(|e| e.pending == 0)
    }

    pub fn publish(&mut self, slot: usize, sequence: u64) {
        let entry = &mut self.entries[slot];
        assert_eq!(
            entry.pending, 0,
            "overwrite of slot {slot} while {} reads are pending",
            entry.pending
        );
        entry.pending = self.reader_count;
        entry.sequence = Some(sequence);
    }

    pub fn consume(&mut self, slot: usize) -> u32 {
        let entry = &mut self.entries[slot];
        assert!(
            entry.pending > 0 && entry.pending <= self.reader_count,
            "slot {slot} consumed with pending count {}",
            entry.pending
        );
        entry.pending -= 1;
        entry.pending
    }
}

unsafe impl ShmSafe for Ledger {}

#[cfg(test)]
mod test {
    use super::Ledger;

    #[test]
    fn starts_free_and_unready() {
        let ledger = Ledger::new(4, 3);
        assert_eq!(ledger.len(), 4);
        assert!(ledger.is_drained());
        assert!((0..4).all(|s| ledger.is_free(s)));
        assert!(!ledger.is_ready(0, 0));
    }

    #[test]
    fn publish_then_drain() {
        let mut ledger = Ledger::new(2, 3);
        ledger.publish(1, 5);
        assert!(!ledger.is_free(1));
        assert!(ledger.is_ready(1, 5));
        assert!(!ledger.is_ready(1, 3));

        assert_eq!(ledger.consume(1), 2);
        assert_eq!(ledger.consume(1), 1);
        assert!(ledger.is_ready(1, 5));
        assert_eq!(ledger.consume(1), 0);

        assert!(ledger.is_free(1));
        assert!(!ledger.is_ready(1, 5));
        assert_eq!(ledger.entry(1).sequence, Some(5));
    }

    #[test]
    #[should_panic(expected = "overwrite of slot 0")]
    fn overwrite_with_pending_reads_panics() {
        let mut ledger = Ledger::new(1, 2);
        ledger.publish(0, 0);
        ledger.consume(0);
        ledger.publish(0, 1);
    }

    #[test]
    #[should_panic(expected = "consumed with pending count 0")]
    fn consume_of_drained_slot_panics() {
        let mut ledger = Ledger::new(1, 1);
        ledger.publish(0, 0);
        ledger.consume(0);
        ledger.consume(0);
    }
}
