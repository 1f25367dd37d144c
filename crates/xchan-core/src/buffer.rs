//! Cursor-addressed byte buffer
//!
//! A [`ByteBuffer`] is a fixed-capacity window over a byte store with the
//! usual `position` / `limit` / `mark` cursors:
//!
//! ```text
//! 0 <= mark <= position <= limit <= capacity
//! ```
//!
//! A buffer is filled in write mode (`put`, or a channel `read`), switched to
//! read mode with [`ByteBuffer::flip`], drained (`get`, or a channel `write`)
//! and recycled with [`ByteBuffer::clear`].
//!
//! ```
//! use xchan_core::ByteBuffer;
//!
//! let mut buf = ByteBuffer::allocate(1024);
//! buf.put(b"hello world")?;
//! buf.flip();
//!
//! let mut dst = [0u8; 11];
//! buf.get(&mut dst)?;
//! assert_eq!(&dst, b"hello world");
//! assert_eq!(buf.position(), buf.limit());
//! # Ok::<(), xchan_core::Error>(())
//! ```

use crate::cursor::Cursor;
use crate::mapped::MappedRegion;
use crate::shm::DirectMemory;
use crate::storage::{MapMode, StorageType};
use crate::{Error, Result};

/// Backing bytes of a buffer
#[derive(Debug)]
enum Store {
    Heap(Box<[u8]>),
    Direct(DirectMemory),
    Mapped(MappedRegion),
}

impl Store {
    fn storage_type(&self) -> StorageType {
        match self {
            Store::Heap(_) => StorageType::Heap,
            Store::Direct(_) => StorageType::Direct,
            Store::Mapped(_) => StorageType::Mapped,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Store::Heap(b) => &b[..],
            Store::Direct(mem) => mem.as_slice(),
            Store::Mapped(region) => region.as_slice(),
        }
    }

    fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        match self {
            Store::Heap(b) => Ok(&mut b[..]),
            Store::Direct(mem) => Ok(mem.as_mut_slice()),
            Store::Mapped(region) => region.as_mut_slice(),
        }
    }
}

/// Fixed-capacity byte buffer with validated cursors
///
/// Not safe for concurrent mutation; share it only behind external
/// synchronization.
#[derive(Debug)]
pub struct ByteBuffer {
    cursor: Cursor,
    store: Store,
}

impl ByteBuffer {
    /// Allocate a heap buffer of `capacity` zeroed bytes
    pub fn allocate(capacity: usize) -> Self {
        Self::from_store(Store::Heap(vec![0u8; capacity].into_boxed_slice()))
    }

    /// Allocate a direct buffer outside the heap
    ///
    /// Direct buffers live in an anonymous shared memory mapping, which lets
    /// the kernel move bytes in and out without staging through the
    /// allocator.
    pub fn allocate_direct(capacity: usize) -> Result<Self> {
        Ok(Self::from_store(Store::Direct(DirectMemory::create(capacity)?)))
    }

    /// Heap buffer over existing bytes; capacity and limit are `bytes.len()`
    pub fn wrap(bytes: Vec<u8>) -> Self {
        Self::from_store(Store::Heap(bytes.into_boxed_slice()))
    }

    pub(crate) fn mapped(region: MappedRegion) -> Self {
        Self::from_store(Store::Mapped(region))
    }

    fn from_store(store: Store) -> Self {
        let cursor = Cursor::new(store.bytes().len());
        Self { cursor, store }
    }

    pub fn capacity(&self) -> usize {
        self.cursor.capacity()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn set_position(&mut self, position: usize) -> Result<()> {
        self.cursor.set_position(position)
    }

    pub fn limit(&self) -> usize {
        self.cursor.limit()
    }

    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        self.cursor.set_limit(limit)
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.cursor.remaining() > 0
    }

    pub fn storage_type(&self) -> StorageType {
        self.store.storage_type()
    }

    pub fn is_direct(&self) -> bool {
        self.storage_type().is_direct()
    }

    /// Mapping mode, for buffers returned by `FileChannel::map`
    pub fn map_mode(&self) -> Option<MapMode> {
        match &self.store {
            Store::Mapped(region) => Some(region.mode()),
            _ => None,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.map_mode() == Some(MapMode::ReadOnly)
    }

    /// Save the current position
    pub fn mark(&mut self) -> &mut Self {
        self.cursor.mark();
        self
    }

    /// Return to the saved position
    pub fn reset(&mut self) -> Result<&mut Self> {
        self.cursor.reset()?;
        Ok(self)
    }

    /// Forget the content: `position = 0`, `limit = capacity`
    ///
    /// The store is not erased; [`ByteBuffer::as_slice`] still shows the old
    /// bytes until they are overwritten.
    pub fn clear(&mut self) -> &mut Self {
        self.cursor.clear();
        self
    }

    /// Switch from filling to draining: `limit = position`, `position = 0`
    pub fn flip(&mut self) -> &mut Self {
        self.cursor.flip();
        self
    }

    /// Re-read the current window from the start
    pub fn rewind(&mut self) -> &mut Self {
        self.cursor.rewind();
        self
    }

    /// Move the unread bytes to the front and switch back to filling
    pub fn compact(&mut self) -> Result<&mut Self> {
        let (start, end) = (self.position(), self.limit());
        self.store.bytes_mut()?.copy_within(start..end, 0);
        self.cursor.compact();
        Ok(self)
    }

    /// Relative bulk put; all or nothing
    pub fn put(&mut self, src: &[u8]) -> Result<&mut Self> {
        let bytes = self.store.bytes_mut()?;
        let range = self.cursor.take_put(src.len())?;
        bytes[range].copy_from_slice(src);
        Ok(self)
    }

    /// Relative put of a single byte
    pub fn put_u8(&mut self, value: u8) -> Result<&mut Self> {
        self.put(&[value])
    }

    /// Absolute put; the cursors are not moved
    pub fn put_at(&mut self, index: usize, value: u8) -> Result<&mut Self> {
        let bytes = self.store.bytes_mut()?;
        bytes[self.cursor.check_index(index)?] = value;
        Ok(self)
    }

    /// Drain `src`'s remaining bytes into this buffer
    pub fn put_buffer(&mut self, src: &mut ByteBuffer) -> Result<&mut Self> {
        let n = src.remaining();
        let remaining = self.remaining();
        if n > remaining {
            return Err(Error::BufferOverflow {
                requested: n,
                remaining,
            });
        }
        self.put(src.remaining_slice())?;
        src.cursor.take_get(n)?;
        Ok(self)
    }

    /// Relative bulk get filling all of `dst`
    pub fn get(&mut self, dst: &mut [u8]) -> Result<&mut Self> {
        let len = dst.len();
        self.get_into(dst, 0, len)
    }

    /// Relative bulk get into `dst[offset..offset + length]`
    pub fn get_into(&mut self, dst: &mut [u8], offset: usize, length: usize) -> Result<&mut Self> {
        let dst_len = dst.len();
        let target = offset
            .checked_add(length)
            .and_then(|end| dst.get_mut(offset..end))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "range {}+{} outside destination of {} bytes",
                    offset, length, dst_len
                ))
            })?;
        let range = self.cursor.take_get(length)?;
        target.copy_from_slice(&self.store.bytes()[range]);
        Ok(self)
    }

    /// Relative get of a single byte
    pub fn get_u8(&mut self) -> Result<u8> {
        let range = self.cursor.take_get(1)?;
        Ok(self.store.bytes()[range.start])
    }

    /// Absolute get; the cursors are not moved
    pub fn get_at(&self, index: usize) -> Result<u8> {
        Ok(self.store.bytes()[self.cursor.check_index(index)?])
    }

    /// Bytes between position and limit
    pub fn remaining_slice(&self) -> &[u8] {
        &self.store.bytes()[self.position()..self.limit()]
    }

    /// Writable bytes between position and limit
    ///
    /// Pair with [`ByteBuffer::advance`] once some prefix has been filled.
    pub fn remaining_slice_mut(&mut self) -> Result<&mut [u8]> {
        let (start, end) = (self.cursor.position(), self.cursor.limit());
        Ok(&mut self.store.bytes_mut()?[start..end])
    }

    /// Move the position forward by `n` bytes
    pub fn advance(&mut self, n: usize) -> Result<()> {
        self.cursor.take_get(n).map(|_| ())
    }

    /// The whole store, ignoring the cursors
    pub fn as_slice(&self) -> &[u8] {
        self.store.bytes()
    }

    /// Flush a writable mapping to its file; other stores have nothing to do
    pub fn force(&self) -> Result<()> {
        match &self.store {
            Store::Mapped(region) => region.flush(),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_flip_get() {
        let mut buf = ByteBuffer::allocate(1024);
        assert_eq!((buf.position(), buf.limit(), buf.capacity()), (0, 1024, 1024));

        buf.put(b"hello world").unwrap();
        assert_eq!((buf.position(), buf.limit()), (11, 1024));

        buf.flip();
        assert_eq!((buf.position(), buf.limit()), (0, 11));

        let mut dst = [0u8; 11];
        buf.get(&mut dst).unwrap();
        assert_eq!(&dst, b"hello world");
        assert_eq!(buf.position(), 11);
        assert_eq!(buf.limit(), 11);
    }

    #[test]
    fn test_rewind_rereads() {
        let mut buf = ByteBuffer::allocate(16);
        buf.put(b"abc").unwrap().flip();

        for _ in 0..3 {
            let mut dst = [0u8; 3];
            buf.get(&mut dst).unwrap();
            assert_eq!(&dst, b"abc");
            buf.rewind();
        }
        assert_eq!((buf.position(), buf.limit()), (0, 3));
    }

    #[test]
    fn test_clear_keeps_content() {
        let mut buf = ByteBuffer::allocate(1024);
        buf.put(b"hello world").unwrap().flip();
        buf.clear();

        assert_eq!((buf.position(), buf.limit()), (0, 1024));
        assert_eq!(&buf.as_slice()[..11], b"hello world");
        assert_eq!(buf.get_u8().unwrap(), b'h');
    }

    #[test]
    fn test_mark_reset() {
        let mut buf = ByteBuffer::allocate(1024);
        buf.put(b"abcde").unwrap().flip();

        let mut dst = [0u8; 5];
        buf.get_into(&mut dst, 0, 2).unwrap();
        assert_eq!(&dst[..2], b"ab");
        assert_eq!(buf.position(), 2);

        buf.mark();
        buf.get_into(&mut dst, 2, 2).unwrap();
        assert_eq!(&dst[2..4], b"cd");
        assert_eq!(buf.position(), 4);

        buf.reset().unwrap();
        assert_eq!(buf.position(), 2);
        assert!(buf.has_remaining());
        assert_eq!(buf.remaining(), 3);

        let mut again = [0u8; 2];
        buf.get(&mut again).unwrap();
        assert_eq!(&again, b"cd");
    }

    #[test]
    fn test_reset_without_mark() {
        let mut buf = ByteBuffer::allocate(8);
        assert!(matches!(buf.reset(), Err(Error::IllegalMark)));

        buf.put(b"xyz").unwrap();
        buf.mark();
        buf.flip();
        assert!(matches!(buf.reset(), Err(Error::IllegalMark)));
    }

    #[test]
    fn test_overflow_and_underflow() {
        let mut buf = ByteBuffer::allocate(4);
        let err = buf.put(b"hello").unwrap_err();
        assert!(matches!(
            err,
            Error::BufferOverflow {
                requested: 5,
                remaining: 4
            }
        ));
        assert_eq!(buf.position(), 0);

        buf.put(b"hi").unwrap().flip();
        let mut dst = [0u8; 3];
        assert!(matches!(
            buf.get(&mut dst),
            Err(Error::BufferUnderflow {
                requested: 3,
                remaining: 2
            })
        ));
        assert_eq!(buf.position(), 0);
    }

    #[test]
    fn test_get_into_bad_range() {
        let mut buf = ByteBuffer::wrap(b"abcd".to_vec());
        let mut dst = [0u8; 2];
        assert!(matches!(
            buf.get_into(&mut dst, 1, 2),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(buf.position(), 0);
    }

    #[test]
    fn test_absolute_access() {
        let mut buf = ByteBuffer::allocate(4);
        buf.put_at(2, 7).unwrap();
        assert_eq!(buf.get_at(2).unwrap(), 7);
        assert_eq!(buf.position(), 0);

        buf.set_limit(2).unwrap();
        assert!(buf.get_at(2).is_err());
    }

    #[test]
    fn test_compact() {
        let mut buf = ByteBuffer::allocate(8);
        buf.put(b"abcdef").unwrap().flip();
        let mut dst = [0u8; 4];
        buf.get(&mut dst).unwrap();

        buf.compact().unwrap();
        assert_eq!((buf.position(), buf.limit()), (2, 8));
        assert_eq!(&buf.as_slice()[..2], b"ef");
    }

    #[test]
    fn test_put_buffer() {
        let mut src = ByteBuffer::wrap(b"payload".to_vec());
        let mut dst = ByteBuffer::allocate(16);
        dst.put_buffer(&mut src).unwrap();
        assert!(!src.has_remaining());
        assert_eq!(dst.position(), 7);

        let mut small = ByteBuffer::allocate(2);
        src.rewind();
        assert!(small.put_buffer(&mut src).is_err());
        assert_eq!(src.position(), 0);
    }

    #[test]
    fn test_direct_buffer() {
        let mut buf = ByteBuffer::allocate_direct(1024).unwrap();
        assert!(buf.is_direct());
        assert_eq!(buf.storage_type(), StorageType::Direct);
        assert_eq!(buf.capacity(), 1024);

        buf.put(b"off heap").unwrap().flip();
        let mut dst = [0u8; 8];
        buf.get(&mut dst).unwrap();
        assert_eq!(&dst, b"off heap");
    }

    #[test]
    fn test_heap_buffer_is_not_direct() {
        let buf = ByteBuffer::allocate(1);
        assert!(!buf.is_direct());
        assert!(!buf.is_read_only());
        assert_eq!(buf.map_mode(), None);
    }
}
