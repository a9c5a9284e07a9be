//! Bounded broadcast ring shared by many readers and many writers.
//!
//! Every value published into the ring is consumed by every reader, in
//! publish order, before its slot may be overwritten. The state lives in a
//! [`SharedState`] which can sit on the heap for a threaded run or inside a
//! [`shm::SharedMemory`] segment for a run across forked processes; the
//! [`Writer`] and [`Reader`] state machines are the same for both.

use anyhow::bail;
use libc::c_int;

pub mod config;
pub mod error;
pub mod group;
pub mod ledger;
pub mod notify;
pub mod reader;
pub mod report;
pub mod shm;
pub mod source;
pub mod state;
pub mod sync;
pub mod writer;

pub use config::Config;
pub use error::{ConfigError, ConsistencyError, SourceError};
pub use notify::{Broadcast, CondvarBroadcast, SemaphoreBroadcast};
pub use reader::{Consumed, Reader};
pub use report::{Role, RunOutcome, WorkerReport};
pub use source::ValueSource;
pub use state::SharedState;
pub use writer::Writer;

pub const MAGIC_VALUE: u32 = 0x52696e67;
pub const DESCRIPTOR: &str = "/broadcast_ring";

/// Upper bound on the ring length, fixed by the shared segment layout.
pub const MAX_SLOTS: usize = 256;
pub const MAX_WORKERS: usize = 128;

pub type Value = i32;

pub trait CheckOk<R> {
    fn r(self, op: &str) -> Result<R, anyhow::Error>;
}

impl CheckOk<()> for c_int {
    fn r(self, op: &str) -> Result<(), anyhow::Error> {
        if self != 0 {
            bail!("Operation {op} failed: Code {self}");
        }
        Ok(())
    }
}
