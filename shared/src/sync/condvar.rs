use std::{cell::UnsafeCell, mem::MaybeUninit};

use libc::{
    pthread_cond_broadcast, pthread_cond_destroy, pthread_cond_init, pthread_cond_t,
    pthread_cond_wait, pthread_condattr_destroy, pthread_condattr_init,
    pthread_condattr_setpshared, PTHREAD_PROCESS_SHARED,
};

use crate::{shm::ShmSafe, CheckOk};

use super::MutexGuard;

#[repr(C)]
#[derive(Debug)]
pub struct Condvar {
    inner: UnsafeCell<MaybeUninit<pthread_cond_t>>,
}

impl Condvar {
    pub fn new(inter_process: bool) -> Self {
        let inner = UnsafeCell::new(MaybeUninit::uninit());
        let mut attr = MaybeUninit::uninit();
        unsafe {
            pthread_condattr_init(attr.as_mut_ptr())
                .r("attr_init")
                .unwrap();

            if inter_process {
                pthread_condattr_setpshared(attr.as_mut_ptr(), PTHREAD_PROCESS_SHARED)
                    .r("attr_setpshared")
                    .unwrap();
            }

            pthread_cond_init((*inner.get()).as_mut_ptr(), attr.as_ptr())
                .r("cond_init")
                .unwrap();
            pthread_condattr_destroy(attr.as_mut_ptr());
        }

        Self { inner }
    }

    pub fn broadcast(&self) {
        unsafe {
            if pthread_cond_broadcast((*self.inner.get()).as_mut_ptr()) != 0 {
                panic!("failed to broadcast condvar");
            }
        }
    }

    /// Atomically releases the guard's mutex and blocks; the mutex is held
    /// again when this returns. Wakeups may be spurious.
    pub fn wait<'m, T>(&self, guard: MutexGuard<'m, T>) -> MutexGuard<'m, T> {
        unsafe {
            if pthread_cond_wait((*self.inner.get()).as_mut_ptr(), guard.get_inner_lock()) != 0 {
                panic!("failed to wait on condvar");
            }
        }
        guard
    }
}

unsafe impl Send for Condvar {}
unsafe impl Sync for Condvar {}

impl Drop for Condvar {
    fn drop(&mut self) {
        if unsafe { pthread_cond_destroy((*self.inner.get()).as_mut_ptr()) } != 0 {
            panic!("failed to destroy condvar");
        }
    }
}

unsafe impl ShmSafe for Condvar {}
