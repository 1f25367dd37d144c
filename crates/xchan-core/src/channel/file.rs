//! File-backed channel

use super::{
    read_into, retry, write_from, Channel, GatheringChannel, ReadableChannel, ScatteringChannel,
    SeekableChannel, WritableChannel,
};
use crate::buffer::ByteBuffer;
use crate::config::TransferConfig;
use crate::mapped::MappedRegion;
use crate::storage::MapMode;
use crate::{scatter, transfer, Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
#[cfg(unix)]
use std::os::fd::{AsFd, BorrowedFd};
use std::path::{Path, PathBuf};

/// How a [`FileChannel`] opens its file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOption {
    Read,
    Write,
    /// Every write lands at the end of the file; implies `Write`
    Append,
    /// Create the file if it does not exist; ignored without `Write`
    Create,
    /// Create the file, failing if it already exists; ignored without `Write`
    CreateExclusive,
    /// Cut an existing file to zero length; ignored without `Write`
    Truncate,
}

/// Channel over a regular file
///
/// The channel position is the file's own cursor, so relative reads and
/// writes share it with kernel-side copies.
pub struct FileChannel {
    file: Option<File>,
    path: Option<PathBuf>,
    readable: bool,
    writable: bool,
    append: bool,
}

impl FileChannel {
    /// Open `path` with the given options
    ///
    /// Without `Read`, `Write` or `Append` the file is opened for reading.
    pub fn open(path: impl AsRef<Path>, options: &[OpenOption]) -> Result<Self> {
        let path = path.as_ref();
        let has = |o: OpenOption| options.contains(&o);

        let append = has(OpenOption::Append);
        let writable = has(OpenOption::Write) || append;
        let readable = has(OpenOption::Read) || !writable;

        let mut opts = OpenOptions::new();
        opts.read(readable).write(writable).append(append);
        if writable {
            if has(OpenOption::CreateExclusive) {
                opts.create_new(true);
            } else if has(OpenOption::Create) {
                opts.create(true);
            }
            if has(OpenOption::Truncate) && !append {
                opts.truncate(true);
            }
        }

        let file = opts.open(path)?;
        log::debug!(
            "opened {} (read={}, write={}, append={})",
            path.display(),
            readable,
            writable,
            append
        );

        Ok(Self {
            file: Some(file),
            path: Some(path.to_path_buf()),
            readable,
            writable,
            append,
        })
    }

    /// Wrap an already open file, declaring how it was opened
    pub fn from_file(file: File, readable: bool, writable: bool) -> Self {
        Self {
            file: Some(file),
            path: None,
            readable,
            writable,
            append: false,
        }
    }

    /// Path the channel was opened from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(Error::ClosedChannel)
    }

    fn readable_file(&self) -> Result<&File> {
        let file = self.file()?;
        if !self.readable {
            return Err(Error::NotReadable);
        }
        Ok(file)
    }

    fn writable_file(&self) -> Result<&File> {
        let file = self.file()?;
        if !self.writable {
            return Err(Error::NotWritable);
        }
        Ok(file)
    }

    /// Set the file length, growing or shrinking it
    ///
    /// Growing is how a fresh file is prepared for a `ReadWrite` mapping.
    pub fn set_len(&mut self, size: u64) -> Result<()> {
        self.writable_file()?.set_len(size)?;
        Ok(())
    }

    /// Flush file content, and metadata if `metadata` is set, to storage
    pub fn force(&self, metadata: bool) -> Result<()> {
        let file = self.file()?;
        if metadata {
            file.sync_all()?;
        } else {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Map `length` bytes starting at `offset` into memory
    ///
    /// The range must lie inside the file as it is now. Mapped buffers stay
    /// valid after the channel is closed.
    pub fn map(&self, mode: MapMode, offset: u64, length: usize) -> Result<ByteBuffer> {
        let file = match mode {
            MapMode::ReadOnly | MapMode::PrivateCopyOnWrite => self.readable_file()?,
            MapMode::ReadWrite => {
                self.readable_file()?;
                self.writable_file()?
            }
        };

        let size = file.metadata()?.len();
        let end = offset.checked_add(length as u64);
        if end.map_or(true, |end| end > size) {
            return Err(Error::InvalidArgument(format!(
                "mapping {}+{} exceeds file size {}",
                offset, length, size
            )));
        }

        let region = MappedRegion::map(file, mode, offset, length)?;
        Ok(ByteBuffer::mapped(region))
    }

    /// Copy up to `count` bytes starting at `offset` into `dst`
    ///
    /// See [`transfer::transfer_to`].
    pub fn transfer_to<D>(&mut self, offset: u64, count: u64, dst: &mut D) -> Result<u64>
    where
        D: WritableChannel + ?Sized,
    {
        transfer::transfer_to(self, offset, count, dst, &TransferConfig::default())
    }

    /// Copy up to `count` bytes from `src` into this file at `position`
    ///
    /// See [`transfer::transfer_from`].
    pub fn transfer_from<S>(&mut self, src: &mut S, position: u64, count: u64) -> Result<u64>
    where
        S: ReadableChannel + ?Sized,
    {
        transfer::transfer_from(self, src, position, count, &TransferConfig::default())
    }
}

impl Channel for FileChannel {
    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            log::debug!("closing file channel {:?}", self.path);
            drop(file);
        }
        Ok(())
    }

    #[cfg(unix)]
    fn descriptor(&self) -> Option<BorrowedFd<'_>> {
        // O_APPEND descriptors are rejected by copy_file_range
        if self.append {
            return None;
        }
        self.file.as_ref().map(|f| f.as_fd())
    }
}

impl ReadableChannel for FileChannel {
    fn read(&mut self, dst: &mut ByteBuffer) -> Result<Option<usize>> {
        let mut file = self.readable_file()?;
        read_into(&mut file, dst)
    }
}

impl WritableChannel for FileChannel {
    fn write(&mut self, src: &mut ByteBuffer) -> Result<usize> {
        let mut file = self.writable_file()?;
        write_from(&mut file, src)
    }
}

impl ScatteringChannel for FileChannel {
    fn read_scatter(&mut self, dsts: &mut [ByteBuffer]) -> Result<Option<u64>> {
        let mut file = self.readable_file()?;
        scatter::read_vectored(&mut file, dsts)
    }
}

impl GatheringChannel for FileChannel {
    fn write_gather(&mut self, srcs: &mut [ByteBuffer]) -> Result<u64> {
        let mut file = self.writable_file()?;
        scatter::write_vectored(&mut file, srcs)
    }
}

impl SeekableChannel for FileChannel {
    fn position(&self) -> Result<u64> {
        let mut file = self.file()?;
        Ok(file.stream_position()?)
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        let mut file = self.file()?;
        file.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        let file = self.writable_file()?;
        if size < file.metadata()?.len() {
            file.set_len(size)?;
        }
        if self.position()? > size {
            self.set_position(size)?;
        }
        Ok(())
    }

    fn read_at(&mut self, dst: &mut ByteBuffer, position: u64) -> Result<Option<usize>> {
        let file = self.readable_file()?;
        if !dst.has_remaining() {
            return Ok(Some(0));
        }
        let n = {
            let window = dst.remaining_slice_mut()?;
            retry(|| pread(file, &mut window[..], position))?
        };
        if n == 0 {
            return Ok(None);
        }
        dst.advance(n)?;
        Ok(Some(n))
    }

    fn write_at(&mut self, src: &mut ByteBuffer, position: u64) -> Result<usize> {
        let file = self.writable_file()?;
        if !src.has_remaining() {
            return Ok(0);
        }
        let window = src.remaining_slice();
        let n = retry(|| pwrite(file, window, position))?;
        src.advance(n)?;
        Ok(n)
    }
}

impl Drop for FileChannel {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for FileChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileChannel")
            .field("path", &self.path)
            .field("open", &self.file.is_some())
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .finish()
    }
}

#[cfg(unix)]
fn pread(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, buf, offset)
}

#[cfg(unix)]
fn pwrite(file: &File, buf: &[u8], offset: u64) -> std::io::Result<usize> {
    std::os::unix::fs::FileExt::write_at(file, buf, offset)
}

// seek_read/seek_write move the Windows file pointer, so restore it
#[cfg(windows)]
fn pread(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    let mut f = file;
    let saved = f.stream_position()?;
    let n = std::os::windows::fs::FileExt::seek_read(file, buf, offset);
    f.seek(SeekFrom::Start(saved))?;
    n
}

#[cfg(windows)]
fn pwrite(file: &File, buf: &[u8], offset: u64) -> std::io::Result<usize> {
    let mut f = file;
    let saved = f.stream_position()?;
    let n = std::os::windows::fs::FileExt::seek_write(file, buf, offset);
    f.seek(SeekFrom::Start(saved))?;
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_with(content: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(content)
            .unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_until_eof() {
        let (_dir, path) = temp_with(b"hello world");
        let mut ch = FileChannel::open(&path, &[OpenOption::Read]).unwrap();
        let mut buf = ByteBuffer::allocate(4);

        let mut out = Vec::new();
        while ch.read(&mut buf).unwrap().is_some() {
            buf.flip();
            out.extend_from_slice(buf.remaining_slice());
            buf.clear();
        }
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn test_read_with_full_buffer_returns_zero() {
        let (_dir, path) = temp_with(b"abc");
        let mut ch = FileChannel::open(&path, &[]).unwrap();
        let mut buf = ByteBuffer::allocate(0);
        assert_eq!(ch.read(&mut buf).unwrap(), Some(0));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (_dir, path) = temp_with(b"abc");
        let mut ch = FileChannel::open(&path, &[OpenOption::Read]).unwrap();
        ch.close().unwrap();
        ch.close().unwrap();
        assert!(!ch.is_open());

        let mut buf = ByteBuffer::allocate(8);
        assert!(matches!(ch.read(&mut buf), Err(Error::ClosedChannel)));
        assert!(matches!(ch.size(), Err(Error::ClosedChannel)));
    }

    #[test]
    fn test_access_checks() {
        let (_dir, path) = temp_with(b"abc");
        let mut ro = FileChannel::open(&path, &[OpenOption::Read]).unwrap();
        let mut buf = ByteBuffer::wrap(b"xyz".to_vec());
        assert!(matches!(ro.write(&mut buf), Err(Error::NotWritable)));

        let mut wo = FileChannel::open(&path, &[OpenOption::Write]).unwrap();
        assert!(matches!(wo.read(&mut buf), Err(Error::NotReadable)));
    }

    #[test]
    fn test_create_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.bin");

        assert!(FileChannel::open(&path, &[OpenOption::Read]).is_err());
        assert!(matches!(
            FileChannel::open(&path, &[OpenOption::Read, OpenOption::Create]),
            Err(Error::Io(_))
        ));

        FileChannel::open(&path, &[OpenOption::Write, OpenOption::CreateExclusive]).unwrap();
        assert!(FileChannel::open(&path, &[OpenOption::Write, OpenOption::CreateExclusive]).is_err());
        FileChannel::open(&path, &[OpenOption::Write, OpenOption::Create]).unwrap();
    }

    #[test]
    fn test_append_and_truncate() {
        let (_dir, path) = temp_with(b"abc");

        let mut ch = FileChannel::open(&path, &[OpenOption::Append]).unwrap();
        ch.write(&mut ByteBuffer::wrap(b"def".to_vec())).unwrap();
        drop(ch);
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");

        let ch = FileChannel::open(&path, &[OpenOption::Write, OpenOption::Truncate]).unwrap();
        assert_eq!(ch.size().unwrap(), 0);
    }

    #[test]
    fn test_position_and_truncate() {
        let (_dir, path) = temp_with(b"0123456789");
        let mut ch = FileChannel::open(&path, &[OpenOption::Read, OpenOption::Write]).unwrap();

        ch.set_position(8).unwrap();
        let mut buf = ByteBuffer::allocate(4);
        assert_eq!(ch.read(&mut buf).unwrap(), Some(2));
        assert_eq!(ch.position().unwrap(), 10);

        ch.truncate(5).unwrap();
        assert_eq!(ch.size().unwrap(), 5);
        assert_eq!(ch.position().unwrap(), 5);

        // truncate never grows
        ch.truncate(50).unwrap();
        assert_eq!(ch.size().unwrap(), 5);
    }

    #[test]
    fn test_positional_io_keeps_position() {
        let (_dir, path) = temp_with(b"0123456789");
        let mut ch = FileChannel::open(&path, &[OpenOption::Read, OpenOption::Write]).unwrap();

        let mut buf = ByteBuffer::allocate(3);
        assert_eq!(ch.read_at(&mut buf, 4).unwrap(), Some(3));
        assert_eq!(&buf.as_slice()[..3], b"456");
        assert_eq!(ch.position().unwrap(), 0);

        let mut buf = ByteBuffer::allocate(3);
        assert_eq!(ch.read_at(&mut buf, 10).unwrap(), None);

        let mut src = ByteBuffer::wrap(b"xy".to_vec());
        assert_eq!(ch.write_at(&mut src, 1).unwrap(), 2);
        assert_eq!(ch.position().unwrap(), 0);
        drop(ch);
        assert_eq!(std::fs::read(&path).unwrap(), b"0xy3456789");
    }
}
