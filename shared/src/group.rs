use std::{
    cell::UnsafeCell,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use arrayvec::ArrayVec;

use crate::{
    shm::ShmSafe,
    sync::{Mutex, Semaphore},
    Value, MAX_SLOTS,
};

/// The value cells behind a reader-group / writer exclusion. The first reader
/// in takes `exclusive` for the whole group and the last one out posts it.
///
/// Lock order: `active_readers` before `exclusive`.
#[repr(C)]
pub struct ReaderGroup {
    active_readers: Mutex<usize>,
    exclusive: Semaphore,
    // Mirrors used only to assert the exclusion actually holds.
    writing: AtomicBool,
    inside: AtomicUsize,
    cells: UnsafeCell<ArrayVec<Option<Value>, MAX_SLOTS>>,
}

impl ReaderGroup {
    pub fn new(slots: usize, inter_process: bool) -> Self {
        let mut cells = ArrayVec::new();
        for _ in 0..slots {
            cells.push(None);
        }
        Self {
            active_readers: Mutex::new(0, inter_process),
            exclusive: Semaphore::new(1, inter_process),
            writing: AtomicBool::new(false),
            inside: AtomicUsize::new(0),
            cells: UnsafeCell::new(cells),
        }
    }

    pub fn join(&self) -> GroupGuard<'_> {
        let mut active = self.active_readers.lock();
        if *active == 0 {
            self.exclusive.wait();
        }
        *active += 1;
        self.inside.fetch_add(1, Ordering::SeqCst);
        drop(active);

        assert!(
            !self.writing.load(Ordering::SeqCst),
            "reader entered while a writer is publishing"
        );
        GroupGuard { group: self }
    }

    pub fn lock_exclusive(&self) -> ExclusiveGuard<'_> {
        self.exclusive.wait();
        assert_eq!(
            self.inside.load(Ordering::SeqCst),
            0,
            "writer entered while readers are consuming"
        );
        self.writing.store(true, Ordering::SeqCst);
        ExclusiveGuard { group: self }
    }

    pub fn active_readers(&self) -> usize {
        *self.active_readers.lock()
    }
}

unsafe impl Send for ReaderGroup {}
unsafe impl Sync for ReaderGroup {}
unsafe impl ShmSafe for ReaderGroup {}

pub struct GroupGuard<'a> {
    group: &'a ReaderGroup,
}

impl GroupGuard<'_> {
    pub fn load(&self, slot: usize) -> Option<Value> {
        // Safety: no writer holds the exclusion while a group guard exists.
        unsafe { (&*self.group.cells.get())[slot] }
    }
}

impl Drop for GroupGuard<'_> {
    fn drop(&mut self) {
        self.group.inside.fetch_sub(1, Ordering::SeqCst);
        let mut active = self.group.active_readers.lock();
        *active -= 1;
        if *active == 0 {
            self.group.exclusive.post();
        }
    }
}

pub struct ExclusiveGuard<'a> {
    group: &'a ReaderGroup,
}

impl ExclusiveGuard<'_> {
    pub fn store(&mut self, slot: usize, value: Value) {
        // Safety: the exclusion semaphore is held, nobody else touches cells.
        unsafe { (&mut *self.group.cells.get())[slot] = Some(value) }
    }

    pub fn load(&self, slot: usize) -> Option<Value> {
        unsafe { (&*self.group.cells.get())[slot] }
    }
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        self.group.writing.store(false, Ordering::SeqCst);
        self.group.exclusive.post();
    }
}
