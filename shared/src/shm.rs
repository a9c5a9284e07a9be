use std::{mem::MaybeUninit, os::fd::OwnedFd, ptr::null_mut};

use rustix::{
    fs::{ftruncate, Mode},
    mm::{mmap, munmap, MapFlags, ProtFlags},
    shm::{self, OFlags},
};

use crate::MAGIC_VALUE;

/// Marker for types that stay valid when their bytes are mapped into several
/// processes: no heap pointers, no process-local handles.
pub unsafe trait ShmSafe {}

unsafe impl ShmSafe for u32 {}
unsafe impl ShmSafe for u64 {}
unsafe impl ShmSafe for usize {}
unsafe impl ShmSafe for bool {}

// Forked children inherit the mapping and leave through `_exit`, so only the
// creator runs `Drop` and unlinks the name.
pub struct SharedMemory<T> {
    is_initiator: bool,
    descriptor: String,
    memory: *mut SharedMemoryContents<T>,
}

impl<T: ShmSafe> SharedMemory<T> {
    pub fn create(
        descriptor: impl Into<String>,
        init: impl FnOnce(&mut MaybeUninit<T>),
    ) -> anyhow::Result<Self> {
        let descriptor = descriptor.into();

        let _ = shm::unlink(&descriptor);

        let fd = shm::open(
            &descriptor,
            OFlags::CREATE | OFlags::EXCL | OFlags::RDWR,
            Mode::RUSR | Mode::WUSR,
        )?;

        ftruncate(&fd, size_of::<SharedMemoryContents<T>>() as u64)?;
        let ptr = unsafe { Self::mmap(fd)? };

        unsafe {
            let magic = &raw mut (*ptr).magic;
            let contents = &raw mut (*ptr).contents;
            *contents = MaybeUninit::uninit();

            init(&mut *contents);

            *magic = MAGIC_VALUE;
        }

        Ok(Self {
            descriptor,
            memory: ptr,
            is_initiator: true,
        })
    }

    pub fn get(&self) -> &T {
        unsafe {
            debug_assert_eq!((*self.memory).magic, MAGIC_VALUE);
            (*self.memory).contents.assume_init_ref()
        }
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    unsafe fn mmap(fd: OwnedFd) -> anyhow::Result<*mut SharedMemoryContents<T>> {
        // Safety: Ptr is null
        Ok(mmap(
            null_mut(),
            size_of::<SharedMemoryContents<T>>(),
            ProtFlags::READ | ProtFlags::WRITE,
            MapFlags::SHARED,
            &fd,
            0,
        )?
        .cast())
    }
}

impl<T> Drop for SharedMemory<T> {
    fn drop(&mut self) {
        if self.is_initiator {
            let _ = shm::unlink(&self.descriptor);
        }
        unsafe {
            let _ = munmap(self.memory.cast(), size_of::<SharedMemoryContents<T>>());
        }
    }
}

unsafe impl<T: Send> Send for SharedMemory<T> {}
unsafe impl<T: Sync> Sync for SharedMemory<T> {}

#[repr(C)]
pub struct SharedMemoryContents<T> {
    magic: u32,
    contents: MaybeUninit<T>,
}
