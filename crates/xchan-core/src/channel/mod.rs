//! Blocking byte channels
//!
//! Channels move bytes between an endpoint and a [`ByteBuffer`]. The trait
//! family mirrors what an endpoint can do:
//!
//! - [`Channel`]: open/closed state, shared by all
//! - [`ReadableChannel`] / [`WritableChannel`]: one buffer at a time
//! - [`ScatteringChannel`] / [`GatheringChannel`]: a sequence of buffers
//! - [`SeekableChannel`]: random access by byte offset
//!
//! Every channel closes its endpoint when dropped, so an error propagated out
//! of a transfer loop never leaks a descriptor.

mod file;
mod socket;
mod stream;

pub use file::{FileChannel, OpenOption};
pub use socket::{ServerSocketChannel, SocketChannel};
pub use stream::StreamChannel;

use crate::buffer::ByteBuffer;
use crate::{Error, Result};
use std::io::{ErrorKind, Read, Write};
#[cfg(unix)]
use std::os::fd::BorrowedFd;

pub trait Channel {
    fn is_open(&self) -> bool;

    /// Release the endpoint. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Raw descriptor for kernel-side copies, if the endpoint has one
    #[cfg(unix)]
    fn descriptor(&self) -> Option<BorrowedFd<'_>> {
        None
    }
}

pub trait ReadableChannel: Channel {
    /// Fill `dst` from its position towards its limit
    ///
    /// Blocks until at least one byte is available. Returns `Ok(None)` at end
    /// of stream and `Ok(Some(0))` when `dst` has no room left.
    fn read(&mut self, dst: &mut ByteBuffer) -> Result<Option<usize>>;
}

pub trait WritableChannel: Channel {
    /// Drain `dst` from its position towards its limit
    ///
    /// May write fewer bytes than remain; callers loop while the buffer has
    /// remaining bytes.
    fn write(&mut self, src: &mut ByteBuffer) -> Result<usize>;
}

pub trait ScatteringChannel: ReadableChannel {
    /// Read into `dsts` in order, filling each to its limit before the next
    fn read_scatter(&mut self, dsts: &mut [ByteBuffer]) -> Result<Option<u64>> {
        crate::scatter::read_each(self, dsts)
    }
}

pub trait GatheringChannel: WritableChannel {
    /// Write `srcs` in order, draining each before the next
    fn write_gather(&mut self, srcs: &mut [ByteBuffer]) -> Result<u64> {
        crate::scatter::write_each(self, srcs)
    }
}

pub trait SeekableChannel: ReadableChannel + WritableChannel {
    fn position(&self) -> Result<u64>;

    fn set_position(&mut self, position: u64) -> Result<()>;

    fn size(&self) -> Result<u64>;

    /// Shrink the endpoint to `size` bytes; larger values are ignored
    fn truncate(&mut self, size: u64) -> Result<()>;

    /// Read at an absolute offset without moving the channel position
    fn read_at(&mut self, dst: &mut ByteBuffer, position: u64) -> Result<Option<usize>>;

    /// Write at an absolute offset without moving the channel position
    fn write_at(&mut self, src: &mut ByteBuffer, position: u64) -> Result<usize>;
}

/// Read from a std reader into the buffer's remaining window
pub(crate) fn read_into<R: Read + ?Sized>(reader: &mut R, dst: &mut ByteBuffer) -> Result<Option<usize>> {
    if !dst.has_remaining() {
        return Ok(Some(0));
    }
    let n = {
        let window = dst.remaining_slice_mut()?;
        retry(|| reader.read(&mut window[..]))?
    };
    if n == 0 {
        return Ok(None);
    }
    dst.advance(n)?;
    Ok(Some(n))
}

/// Write the buffer's remaining window to a std writer
pub(crate) fn write_from<W: Write + ?Sized>(writer: &mut W, src: &mut ByteBuffer) -> Result<usize> {
    if !src.has_remaining() {
        return Ok(0);
    }
    let window = src.remaining_slice();
    let n = retry(|| writer.write(window))?;
    src.advance(n)?;
    Ok(n)
}

/// Run a blocking syscall wrapper, restarting it on `EINTR`
pub(crate) fn retry<T, F>(mut op: F) -> Result<T>
where
    F: FnMut() -> std::io::Result<T>,
{
    loop {
        match op() {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other.map_err(Error::from),
        }
    }
}
