//! Scattering reads and gathering writes over a sequence of buffers
//!
//! A scattering read fills buffer `i` to its limit before buffer `i + 1`
//! receives anything; a gathering write drains them in the same order. The
//! per-buffer fallbacks and the vectored fast paths are observably the same.

use crate::buffer::ByteBuffer;
use crate::channel::{
    retry, Channel, GatheringChannel, ReadableChannel, ScatteringChannel, WritableChannel,
};
use crate::{Error, Result};
use std::io::{IoSlice, IoSliceMut, Read, Write};

/// Scatter bytes from `channel` across `dsts`
///
/// Returns the total read, or `None` if end-of-stream was reached before any
/// byte arrived.
pub fn read_scatter<C>(channel: &mut C, dsts: &mut [ByteBuffer]) -> Result<Option<u64>>
where
    C: ScatteringChannel + ?Sized,
{
    channel.read_scatter(dsts)
}

/// Gather the remaining bytes of `srcs` into `channel`
pub fn write_gather<C>(channel: &mut C, srcs: &mut [ByteBuffer]) -> Result<u64>
where
    C: GatheringChannel + ?Sized,
{
    channel.write_gather(srcs)
}

/// One `read` per buffer, stopping at the first buffer left unfilled
pub(crate) fn read_each<C>(channel: &mut C, dsts: &mut [ByteBuffer]) -> Result<Option<u64>>
where
    C: ReadableChannel + ?Sized,
{
    if !channel.is_open() {
        return Err(Error::ClosedChannel);
    }
    let mut total = 0u64;
    for dst in dsts.iter_mut().filter(|b| b.has_remaining()) {
        match channel.read(dst)? {
            Some(n) => total += n as u64,
            None if total == 0 => return Ok(None),
            None => break,
        }
        if dst.has_remaining() {
            break;
        }
    }
    Ok(Some(total))
}

/// One `write` per buffer, stopping at the first short write
pub(crate) fn write_each<C>(channel: &mut C, srcs: &mut [ByteBuffer]) -> Result<u64>
where
    C: WritableChannel + ?Sized,
{
    if !channel.is_open() {
        return Err(Error::ClosedChannel);
    }
    let mut total = 0u64;
    for src in srcs.iter_mut().filter(|b| b.has_remaining()) {
        total += channel.write(src)? as u64;
        if src.has_remaining() {
            break;
        }
    }
    Ok(total)
}

/// Single `readv` across every buffer's remaining window
pub(crate) fn read_vectored<R>(reader: &mut R, dsts: &mut [ByteBuffer]) -> Result<Option<u64>>
where
    R: Read + ?Sized,
{
    let wanted: usize = dsts.iter().map(ByteBuffer::remaining).sum();
    if wanted == 0 {
        return Ok(Some(0));
    }

    let n = {
        let mut slices = Vec::with_capacity(dsts.len());
        for dst in dsts.iter_mut() {
            slices.push(IoSliceMut::new(dst.remaining_slice_mut()?));
        }
        retry(|| reader.read_vectored(&mut slices))?
    };
    if n == 0 {
        return Ok(None);
    }

    distribute(dsts, n)?;
    Ok(Some(n as u64))
}

/// Single `writev` across every buffer's remaining window
pub(crate) fn write_vectored<W>(writer: &mut W, srcs: &mut [ByteBuffer]) -> Result<u64>
where
    W: Write + ?Sized,
{
    let n = {
        let slices: Vec<IoSlice<'_>> = srcs
            .iter()
            .map(|src| IoSlice::new(src.remaining_slice()))
            .collect();
        if slices.iter().all(|s| s.is_empty()) {
            return Ok(0);
        }
        retry(|| writer.write_vectored(&slices))?
    };

    distribute(srcs, n)?;
    Ok(n as u64)
}

/// Advance buffers in list order until `n` bytes are accounted for
fn distribute(buffers: &mut [ByteBuffer], mut n: usize) -> Result<()> {
    for buf in buffers.iter_mut() {
        if n == 0 {
            break;
        }
        let step = n.min(buf.remaining());
        buf.advance(step)?;
        n -= step;
    }
    debug_assert_eq!(n, 0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::StreamChannel;
    use std::io::Cursor;

    fn bufs(caps: &[usize]) -> Vec<ByteBuffer> {
        caps.iter().map(|&c| ByteBuffer::allocate(c)).collect()
    }

    #[test]
    fn test_read_each_fills_in_order() {
        let data: Vec<u8> = (0..1500u32).map(|i| i as u8).collect();
        let mut ch = StreamChannel::new(Cursor::new(data.clone()));
        let mut dsts = bufs(&[1024, 1024]);

        // Cursor reads are never short, so one call fills the first buffer
        let mut total = 0;
        while let Some(n) = read_scatter(&mut ch, &mut dsts).unwrap() {
            if n == 0 {
                break;
            }
            total += n;
        }
        assert_eq!(total, 1500);
        assert_eq!(dsts[0].position(), 1024);
        assert_eq!(dsts[1].position(), 476);
        assert_eq!(&dsts[0].as_slice()[..], &data[..1024]);
        assert_eq!(&dsts[1].as_slice()[..476], &data[1024..]);
    }

    #[test]
    fn test_read_each_eof_before_data() {
        let mut ch = StreamChannel::new(Cursor::new(Vec::new()));
        let mut dsts = bufs(&[4, 4]);
        assert_eq!(read_scatter(&mut ch, &mut dsts).unwrap(), None);
    }

    #[test]
    fn test_read_vectored_distributes() {
        let mut src = Cursor::new(b"abcdefgh".to_vec());
        let mut dsts = bufs(&[3, 0, 10]);
        assert_eq!(read_vectored(&mut src, &mut dsts).unwrap(), Some(8));
        assert_eq!(dsts[0].position(), 3);
        assert_eq!(dsts[1].position(), 0);
        assert_eq!(dsts[2].position(), 5);
        assert_eq!(read_vectored(&mut src, &mut dsts).unwrap(), None);
    }

    #[test]
    fn test_write_gather_preserves_order() {
        let mut ch = StreamChannel::new(Vec::new());
        let mut srcs = vec![
            ByteBuffer::wrap(b"gather ".to_vec()),
            ByteBuffer::allocate(0),
            ByteBuffer::wrap(b"in order".to_vec()),
        ];
        let mut total = 0;
        while srcs.iter().any(ByteBuffer::has_remaining) {
            total += write_gather(&mut ch, &mut srcs).unwrap();
        }
        assert_eq!(total, 15);
        assert_eq!(ch.into_inner().unwrap(), b"gather in order");
    }

    #[test]
    fn test_write_vectored_partial_buffers() {
        let mut srcs = vec![
            ByteBuffer::wrap(b"xxhead".to_vec()),
            ByteBuffer::wrap(b"tail".to_vec()),
        ];
        srcs[0].set_position(2).unwrap();

        let mut out = Vec::new();
        let mut total = 0;
        while srcs.iter().any(ByteBuffer::has_remaining) {
            total += write_vectored(&mut out, &mut srcs).unwrap();
        }
        assert_eq!(total, 8);
        assert_eq!(out, b"headtail");
    }
}
