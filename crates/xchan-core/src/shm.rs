//! Off-heap storage for direct buffers, backed by POSIX shared memory

use crate::{Error, Result};
use shared_memory::{Shmem, ShmemConf};

/// Anonymous shared memory region owned by a single direct buffer
///
/// The OS identifier is generated by `shared_memory` and unlinked when the
/// region is dropped.
pub struct DirectMemory {
    inner: Option<Shmem>,
    size: usize,
}

impl DirectMemory {
    /// Map a zero-filled region of `size` bytes
    pub fn create(size: usize) -> Result<Self> {
        if size == 0 {
            return Ok(Self { inner: None, size });
        }

        let shmem = ShmemConf::new()
            .size(size)
            .create()
            .map_err(|e| Error::SharedMemory(e.to_string()))?;
        log::trace!("mapped {} direct bytes at {}", size, shmem.get_os_id());

        Ok(Self {
            inner: Some(shmem),
            size,
        })
    }

    /// Get a slice view of the region
    pub fn as_slice(&self) -> &[u8] {
        match &self.inner {
            // SAFETY: the mapping is `size` bytes long and lives as long as `self`
            Some(shmem) => unsafe { std::slice::from_raw_parts(shmem.as_ptr(), self.size) },
            None => &[],
        }
    }

    /// Get a mutable slice view of the region
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.inner {
            // SAFETY: as above; `&mut self` guarantees exclusive access
            Some(shmem) => unsafe { std::slice::from_raw_parts_mut(shmem.as_ptr(), self.size) },
            None => &mut [],
        }
    }
}

impl std::fmt::Debug for DirectMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectMemory")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
