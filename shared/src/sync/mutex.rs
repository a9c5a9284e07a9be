use std::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    ops::{Deref, DerefMut},
};

use libc::{
    pthread_mutex_destroy, pthread_mutex_init, pthread_mutex_lock, pthread_mutex_t,
    pthread_mutex_unlock, pthread_mutexattr_destroy, pthread_mutexattr_init,
    pthread_mutexattr_setpshared, PTHREAD_PROCESS_SHARED,
};

use crate::{shm::ShmSafe, CheckOk};

/// A pthread mutex that can live inside a shared mapping when created with
/// `inter_process` set.
#[repr(C)]
#[derive(Debug)]
pub struct Mutex<T> {
    lock: UnsafeCell<MaybeUninit<pthread_mutex_t>>,
    data: UnsafeCell<T>,
}

impl<T> Mutex<T> {
    pub fn new(value: T, inter_process: bool) -> Self {
        let lock = UnsafeCell::new(MaybeUninit::uninit());
        let mut attr = MaybeUninit::uninit();
        unsafe {
            pthread_mutexattr_init(attr.as_mut_ptr())
                .r("attr_init")
                .unwrap();

            if inter_process {
                pthread_mutexattr_setpshared(attr.as_mut_ptr(), PTHREAD_PROCESS_SHARED)
                    .r("attr_setpshared")
                    .unwrap();
            }

            pthread_mutex_init((*lock.get()).as_mut_ptr(), attr.as_ptr())
                .r("mutex_init")
                .unwrap();
            pthread_mutexattr_destroy(attr.as_mut_ptr());
        }

        Self {
            lock,
            data: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        unsafe {
            if pthread_mutex_lock((*self.lock.get()).as_mut_ptr()) != 0 {
                panic!("failed to lock mutex");
            }
            MutexGuard {
                lock: self,
                data: &mut *self.data.get(),
            }
        }
    }
}

pub struct MutexGuard<'a, T: 'a> {
    lock: &'a Mutex<T>,
    data: &'a mut T,
}

impl<'a, T: 'a> MutexGuard<'a, T> {
    pub fn get_inner_lock(&self) -> *mut pthread_mutex_t {
        unsafe { (*self.lock.lock.get()).as_mut_ptr() }
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        unsafe {
            if pthread_mutex_unlock(self.get_inner_lock()) != 0 {
                panic!("failed to unlock mutex");
            }
        }
    }
}

unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Drop for Mutex<T> {
    fn drop(&mut self) {
        if unsafe { pthread_mutex_destroy((*self.lock.get()).as_mut_ptr()) } != 0 {
            panic!("failed to destroy mutex");
        }
    }
}

unsafe impl<T> ShmSafe for Mutex<T> where T: ShmSafe {}

#[cfg(test)]
mod test {
    use std::thread;

    use super::Mutex;

    #[test]
    fn counts_across_threads() {
        let counter = Mutex::new(0u64, false);
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        *counter.lock() += 1;
                    }
                });
            }
        });
        assert_eq!(*counter.lock(), 4000);
    }
}
