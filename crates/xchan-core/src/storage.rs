//! Storage type definitions

/// Where a buffer's bytes live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// Privately owned heap allocation
    Heap,
    /// Off-heap shared memory region
    Direct,
    /// Memory-mapped file region
    Mapped,
}

impl StorageType {
    /// Direct and mapped stores sit outside the allocator
    pub fn is_direct(&self) -> bool {
        !matches!(self, StorageType::Heap)
    }
}

/// Access mode for a file mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Reads only; any mutation fails with `Error::ReadOnly`
    ReadOnly,
    /// Writes go through to the file
    ReadWrite,
    /// Writes stay in a private copy and never reach the file
    PrivateCopyOnWrite,
}

impl MapMode {
    /// Whether buffers of this mode accept `put`
    pub fn is_writable(&self) -> bool {
        !matches!(self, MapMode::ReadOnly)
    }
}
