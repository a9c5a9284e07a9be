//! Waiter-counted broadcast conditions.
//!
//! A party that finds its predicate false calls [`Broadcast::register`]
//! while it still holds the lock protecting that predicate, releases the
//! lock, then calls [`Broadcast::wait`]. Whoever changes the predicate does
//! so under the same lock and calls [`Broadcast::notify_all`] afterwards.
//! Registration happening under the predicate lock is what rules out a lost
//! wakeup: either the change is visible to the check, or the waiter is
//! already counted when the notification is issued.
//!
//! Waking says nothing about the predicate. Callers always re-check it.

use crate::{
    shm::ShmSafe,
    sync::{Condvar, Mutex, Semaphore},
};

pub trait Broadcast: ShmSafe + Send + Sync + Sized {
    type Ticket;

    fn new(inter_process: bool) -> Self;

    fn register(&self) -> Self::Ticket;

    /// Blocks until a [`notify_all`](Self::notify_all) issued after the
    /// matching `register` call.
    fn wait(&self, ticket: Self::Ticket);

    fn notify_all(&self);

    fn waiters(&self) -> u32;
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct Epoch {
    generation: u64,
    waiters: u32,
}

unsafe impl ShmSafe for Epoch {}

/// Broadcast on top of a pthread condition variable. Each notification
/// starts a new generation, and a waiter sleeps until the generation it
/// registered in has passed.
#[repr(C)]
#[derive(Debug)]
pub struct CondvarBroadcast {
    epoch: Mutex<Epoch>,
    cond: Condvar,
}

#[derive(Debug)]
pub struct Generation(u64);

impl Broadcast for CondvarBroadcast {
    type Ticket = Generation;

    fn new(inter_process: bool) -> Self {
        Self {
            epoch: Mutex::new(
                Epoch {
                    generation: 0,
                    waiters: 0,
                },
                inter_process,
            ),
            cond: Condvar::new(inter_process),
        }
    }

    fn register(&self) -> Generation {
        let mut epoch = self.epoch.lock();
        epoch.waiters += 1;
        Generation(epoch.generation)
    }

    fn wait(&self, ticket: Generation) {
        let mut epoch = self.epoch.lock();
        while epoch.generation == ticket.0 {
            epoch = self.cond.wait(epoch);
        }
        epoch.waiters -= 1;
    }

    fn notify_all(&self) {
        let mut epoch = self.epoch.lock();
        epoch.generation = epoch.generation.wrapping_add(1);
        if epoch.waiters > 0 {
            self.cond.broadcast();
        }
    }

    fn waiters(&self) -> u32 {
        self.epoch.lock().waiters
    }
}

unsafe impl ShmSafe for CondvarBroadcast {}

/// Broadcast built from counting semaphores only.
///
/// `notify_all` posts `wakeup` once per registered waiter and then collects
/// one `handshake` per post before it releases the counter. Nobody can
/// register in between, so a late waiter never eats a post that belongs to
/// an earlier one.
#[repr(C)]
#[derive(Debug)]
pub struct SemaphoreBroadcast {
    waiters: Mutex<u32>,
    wakeup: Semaphore,
    handshake: Semaphore,
}

impl Broadcast for SemaphoreBroadcast {
    type Ticket = ();

    fn new(inter_process: bool) -> Self {
        Self {
            waiters: Mutex::new(0, inter_process),
            wakeup: Semaphore::new(0, inter_process),
            handshake: Semaphore::new(0, inter_process),
        }
    }

    fn register(&self) {
        *self.waiters.lock() += 1;
    }

    fn wait(&self, _ticket: ()) {
        self.wakeup.wait();
        self.handshake.post();
    }

    fn notify_all(&self) {
        let mut waiters = self.waiters.lock();
        for _ in 0..*waiters {
            self.wakeup.post();
        }
        while *waiters > 0 {
            self.handshake.wait();
            *waiters -= 1;
        }
    }

    fn waiters(&self) -> u32 {
        *self.waiters.lock()
    }
}

unsafe impl ShmSafe for SemaphoreBroadcast {}
