//! Channel-to-channel transfer
//!
//! [`copy`] is the canonical `read -> flip -> write -> clear` loop. The
//! `transfer_*` functions move bytes between a file and another channel,
//! preferring a kernel-side copy (`copy_file_range`, then `sendfile`) when
//! both endpoints expose a descriptor and falling back to a buffered loop
//! that produces the same bytes otherwise.

use crate::buffer::ByteBuffer;
use crate::channel::{Channel, ReadableChannel, SeekableChannel, WritableChannel};
use crate::config::TransferConfig;
use crate::{Error, Result};

/// Counters from a [`copy`] loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Bytes written to the sink
    pub bytes: u64,
    /// Reads that returned data
    pub reads: u64,
}

/// Pump `src` into `dst` through `buf` until end-of-stream
///
/// `buf` is cleared before use and left cleared afterwards. An I/O error
/// aborts the loop; whatever was already written stays written.
pub fn copy<S, D>(src: &mut S, dst: &mut D, buf: &mut ByteBuffer) -> Result<CopyStats>
where
    S: ReadableChannel + ?Sized,
    D: WritableChannel + ?Sized,
{
    if buf.capacity() == 0 {
        return Err(Error::InvalidArgument("copy buffer has no capacity".to_string()));
    }

    let mut stats = CopyStats::default();
    buf.clear();
    while let Some(n) = src.read(buf)? {
        if n > 0 {
            stats.reads += 1;
        }
        buf.flip();
        stats.bytes += drain(dst, buf)?;
        buf.clear();
    }
    Ok(stats)
}

/// Copy up to `count` bytes of `src`, starting at `offset`, into `dst`
///
/// The source position is left untouched; the destination receives the
/// bytes at its current position. Returns the number of bytes moved, which
/// is short only when the source ends first. An `offset` at or beyond the
/// end of the source moves nothing.
pub fn transfer_to<S, D>(
    src: &mut S,
    offset: u64,
    count: u64,
    dst: &mut D,
    config: &TransferConfig,
) -> Result<u64>
where
    S: SeekableChannel + ?Sized,
    D: WritableChannel + ?Sized,
{
    ensure_open(src.is_open(), dst.is_open())?;
    let size = src.size()?;
    if offset >= size || count == 0 {
        return Ok(0);
    }
    let count = count.min(size - offset);

    #[cfg(all(feature = "zero-copy", target_os = "linux", target_pointer_width = "64"))]
    {
        if let (true, Some(in_fd), Some(out_fd)) =
            (config.zero_copy, src.descriptor(), dst.descriptor())
        {
            let moved = crate::zero_copy::copy_range(in_fd, Some(offset), out_fd, None, count)?;
            if let Some(n) = moved {
                log::debug!("transfer_to: kernel copy of {} bytes", n);
                return Ok(n);
            }
        }
    }

    log::debug!("transfer_to: buffered copy of {} bytes", count);
    let mut buf = ByteBuffer::allocate(staging_size(config, count));
    let mut done = 0u64;
    while done < count {
        buf.clear();
        buf.set_limit(staging_size(config, count - done).min(buf.capacity()))?;
        match src.read_at(&mut buf, offset + done)? {
            None | Some(0) => break,
            Some(_) => {}
        }
        buf.flip();
        done += drain(dst, &mut buf)?;
    }
    Ok(done)
}

/// Copy up to `count` bytes from `src` into `dst` at `position`
///
/// `src` is consumed from its current position; the destination's position
/// is left untouched. A `position` beyond the end of the destination moves
/// nothing.
pub fn transfer_from<D, S>(
    dst: &mut D,
    src: &mut S,
    position: u64,
    count: u64,
    config: &TransferConfig,
) -> Result<u64>
where
    D: SeekableChannel + ?Sized,
    S: ReadableChannel + ?Sized,
{
    ensure_open(src.is_open(), dst.is_open())?;
    if position > dst.size()? || count == 0 {
        return Ok(0);
    }

    #[cfg(all(feature = "zero-copy", target_os = "linux", target_pointer_width = "64"))]
    {
        if let (true, Some(in_fd), Some(out_fd)) =
            (config.zero_copy, src.descriptor(), dst.descriptor())
        {
            let moved = crate::zero_copy::copy_range(in_fd, None, out_fd, Some(position), count)?;
            if let Some(n) = moved {
                log::debug!("transfer_from: kernel copy of {} bytes", n);
                return Ok(n);
            }
        }
    }

    log::debug!("transfer_from: buffered copy of up to {} bytes", count);
    let mut buf = ByteBuffer::allocate(staging_size(config, count));
    let mut done = 0u64;
    while done < count {
        buf.clear();
        buf.set_limit(staging_size(config, count - done).min(buf.capacity()))?;
        match src.read(&mut buf)? {
            None | Some(0) => break,
            Some(_) => {}
        }
        buf.flip();
        while buf.has_remaining() {
            let n = dst.write_at(&mut buf, position + done)?;
            if n == 0 {
                return Err(write_zero());
            }
            done += n as u64;
        }
    }
    Ok(done)
}

/// Write every remaining byte of `buf` to `dst`
fn drain<D: WritableChannel + ?Sized>(dst: &mut D, buf: &mut ByteBuffer) -> Result<u64> {
    let mut written = 0u64;
    while buf.has_remaining() {
        let n = dst.write(buf)?;
        if n == 0 {
            return Err(write_zero());
        }
        written += n as u64;
    }
    Ok(written)
}

fn staging_size(config: &TransferConfig, count: u64) -> usize {
    usize::try_from(count).map_or(config.buffer_size, |c| c.min(config.buffer_size))
}

fn ensure_open(src_open: bool, dst_open: bool) -> Result<()> {
    if src_open && dst_open {
        Ok(())
    } else {
        Err(Error::ClosedChannel)
    }
}

fn write_zero() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::WriteZero,
        "sink accepted no bytes",
    ))
}
