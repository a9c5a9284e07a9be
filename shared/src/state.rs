use crate::{
    config::Config,
    error::ConfigError,
    group::ReaderGroup,
    ledger::{Ledger, SlotEntry},
    notify::Broadcast,
    shm::ShmSafe,
    sync::Mutex,
};

/// Guarded by the write serialization lock.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct WriterState {
    pub cursor: usize,
    pub total_writes: u64,
}

unsafe impl ShmSafe for WriterState {}

/// Everything readers and writers share for one run. With `inter_process`
/// set it can live in a [`crate::shm::SharedMemory`] segment.
#[repr(C)]
pub struct SharedState<B> {
    pub(crate) config: Config,
    pub(crate) writer: Mutex<WriterState>,
    pub(crate) ledger: Mutex<Ledger>,
    pub(crate) group: ReaderGroup,
    /// Readers wait here for a publish.
    pub(crate) new_value: B,
    /// Writers wait here for a slot to drain.
    pub(crate) slot_free: B,
}

impl<B: Broadcast> SharedState<B> {
    pub fn new(config: Config, inter_process: bool) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            writer: Mutex::new(
                WriterState {
                    cursor: 0,
                    total_writes: 0,
                },
                inter_process,
            ),
            ledger: Mutex::new(
                Ledger::new(config.slots, config.reader_count),
                inter_process,
            ),
            group: ReaderGroup::new(config.slots, inter_process),
            new_value: B::new(inter_process),
            slot_free: B::new(inter_process),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn total_writes(&self) -> u64 {
        self.writer.lock().total_writes
    }

    pub fn cursor(&self) -> usize {
        self.writer.lock().cursor
    }

    pub fn ledger_snapshot(&self) -> Vec<SlotEntry> {
        let ledger = self.ledger.lock();
        (0..ledger.len()).map(|slot| ledger.entry(slot)).collect()
    }

    pub fn is_drained(&self) -> bool {
        self.ledger.lock().is_drained()
    }

    pub fn active_readers(&self) -> usize {
        self.group.active_readers()
    }
}

unsafe impl<B: ShmSafe> ShmSafe for SharedState<B> {}
