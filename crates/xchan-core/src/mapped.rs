//! Memory-mapped file regions

use crate::storage::MapMode;
use crate::{Error, Result};
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::File;

enum Mapping {
    /// Zero-length request; nothing is mapped
    Empty,
    ReadOnly(Mmap),
    Mutable(MmapMut),
}

/// A window of a file mapped into memory
///
/// Reads and writes act on the page cache directly. The mapping is released
/// when the region is dropped.
pub struct MappedRegion {
    mapping: Mapping,
    mode: MapMode,
    offset: u64,
    length: usize,
}

impl MappedRegion {
    /// Map `length` bytes of `file` starting at `offset`
    ///
    /// The caller has already checked that the range lies inside the file and
    /// that the file's access rights match `mode`.
    pub(crate) fn map(file: &File, mode: MapMode, offset: u64, length: usize) -> Result<Self> {
        let mapping = if length == 0 {
            Mapping::Empty
        } else {
            let mut options = MmapOptions::new();
            options.offset(offset).len(length);
            // SAFETY: the file stays open for the duration of the call and the
            // mapping owns its own reference to the pages. Concurrent truncation
            // of the file by another process is outside what we can guard.
            unsafe {
                match mode {
                    MapMode::ReadOnly => Mapping::ReadOnly(options.map(file)?),
                    MapMode::ReadWrite => Mapping::Mutable(options.map_mut(file)?),
                    MapMode::PrivateCopyOnWrite => Mapping::Mutable(options.map_copy(file)?),
                }
            }
        };
        log::debug!("mapped {} bytes at offset {} ({:?})", length, offset, mode);

        Ok(Self {
            mapping,
            mode,
            offset,
            length,
        })
    }

    pub fn mode(&self) -> MapMode {
        self.mode
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.mapping {
            Mapping::Empty => &[],
            Mapping::ReadOnly(m) => &m[..],
            Mapping::Mutable(m) => &m[..],
        }
    }

    /// Mutable view; read-only mappings refuse
    pub fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        match &mut self.mapping {
            Mapping::ReadOnly(_) => Err(Error::ReadOnly),
            Mapping::Empty if !self.mode.is_writable() => Err(Error::ReadOnly),
            Mapping::Empty => Ok(&mut []),
            Mapping::Mutable(m) => Ok(&mut m[..]),
        }
    }

    /// Flush modified pages of a shared writable mapping to the file
    pub fn flush(&self) -> Result<()> {
        match (&self.mapping, self.mode) {
            (Mapping::Mutable(m), MapMode::ReadWrite) => Ok(m.flush()?),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRegion")
            .field("mode", &self.mode)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish()
    }
}
