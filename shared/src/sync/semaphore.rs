use std::{cell::UnsafeCell, mem::MaybeUninit};

use libc::{__errno_location, c_int, sem_destroy, sem_init, sem_post, sem_t, sem_wait, EINTR};

use crate::shm::ShmSafe;

/// Counting POSIX semaphore. Unlike [`super::Mutex`] it may be released by a
/// different thread or process than the one that acquired it.
#[repr(C)]
#[derive(Debug)]
pub struct Semaphore {
    inner: UnsafeCell<MaybeUninit<sem_t>>,
}

impl Semaphore {
    pub fn new(value: u32, inter_process: bool) -> Self {
        let inner = UnsafeCell::new(MaybeUninit::uninit());
        let pshared = c_int::from(inter_process);
        if unsafe { sem_init((*inner.get()).as_mut_ptr(), pshared, value) } != 0 {
            panic!("failed to initialize semaphore");
        }
        Self { inner }
    }

    pub fn wait(&self) {
        loop {
            if unsafe { sem_wait((*self.inner.get()).as_mut_ptr()) } == 0 {
                return;
            }
            // Signal delivery interrupts sem_wait regardless of SA_RESTART.
            if unsafe { *__errno_location() } != EINTR {
                panic!("failed to wait for semaphore");
            }
        }
    }

    pub fn post(&self) {
        if unsafe { sem_post((*self.inner.get()).as_mut_ptr()) } != 0 {
            panic!("failed to post semaphore");
        }
    }
}

unsafe impl Send for Semaphore {}
unsafe impl Sync for Semaphore {}

impl Drop for Semaphore {
    fn drop(&mut self) {
        if unsafe { sem_destroy((*self.inner.get()).as_mut_ptr()) } != 0 {
            panic!("failed to destroy semaphore");
        }
    }
}

unsafe impl ShmSafe for Semaphore {}
