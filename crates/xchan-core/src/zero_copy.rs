//! Kernel-side copies between descriptors (Linux)

use crate::{Error, Result};
use nix::errno::Errno;
use nix::fcntl::copy_file_range;
use nix::sys::sendfile::sendfile;
use std::os::fd::BorrowedFd;

/// Largest single request; the kernel caps transfers just below 2 GiB anyway
const MAX_CHUNK: usize = 0x7fff_f000;

/// Copy `count` bytes from `src` to `dst` without leaving the kernel
///
/// A `None` offset means "use and advance the descriptor's own position".
/// Returns `Ok(None)` when the kernel refuses this descriptor pair before any
/// byte has moved, so the caller can fall back to a buffered copy.
pub(crate) fn copy_range(
    src: BorrowedFd<'_>,
    src_offset: Option<u64>,
    dst: BorrowedFd<'_>,
    dst_offset: Option<u64>,
    count: u64,
) -> Result<Option<u64>> {
    let mut off_in = src_offset.map(to_off).transpose()?;
    let mut off_out = dst_offset.map(to_off).transpose()?;

    let copied = drive(count, |len| {
        copy_file_range(src, off_in.as_mut(), dst, off_out.as_mut(), len)
    })?;
    if copied.is_some() {
        return Ok(copied);
    }

    // sendfile writes at the destination's own position only
    if dst_offset.is_some() {
        return Ok(None);
    }
    let mut off_in = src_offset.map(to_off).transpose()?;
    let sent = drive(count, |len| sendfile(dst, src, off_in.as_mut(), len))?;
    if sent.is_some() {
        log::trace!("copy_file_range unsupported, used sendfile");
    }
    Ok(sent)
}

fn drive<F>(count: u64, mut step: F) -> Result<Option<u64>>
where
    F: FnMut(usize) -> nix::Result<usize>,
{
    let mut done = 0u64;
    while done < count {
        let len = usize::try_from(count - done).unwrap_or(MAX_CHUNK).min(MAX_CHUNK);
        match step(len) {
            Ok(0) => break,
            Ok(n) => {
                done += n as u64;
                log::trace!("kernel copy moved {} bytes ({}/{})", n, done, count);
            }
            Err(Errno::EINTR) => continue,
            Err(e) if done == 0 && unsupported(e) => return Ok(None),
            Err(e) => return Err(Error::Io(e.into())),
        }
    }
    Ok(Some(done))
}

fn unsupported(errno: Errno) -> bool {
    matches!(
        errno,
        Errno::ENOSYS | Errno::EXDEV | Errno::EINVAL | Errno::EOPNOTSUPP | Errno::EBADF
    )
}

fn to_off(offset: u64) -> Result<i64> {
    i64::try_from(offset)
        .map_err(|_| Error::InvalidArgument(format!("offset {} out of range", offset)))
}
