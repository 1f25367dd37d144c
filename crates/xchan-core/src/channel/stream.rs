//! Channel adapter over arbitrary `std::io` endpoints

use super::{
    read_into, write_from, Channel, GatheringChannel, ReadableChannel, ScatteringChannel,
    WritableChannel,
};
use crate::buffer::ByteBuffer;
use crate::{Error, Result};
use std::io::{Read, Write};

/// Channel over any reader, writer, or both
///
/// Readability and writability follow the wrapped type's `Read` / `Write`
/// impls. `close` just drops the endpoint; buffered writers should go
/// through [`StreamChannel::close_flush`].
pub struct StreamChannel<S> {
    inner: Option<S>,
}

impl<S> StreamChannel<S> {
    pub fn new(inner: S) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn get_ref(&self) -> Result<&S> {
        self.inner.as_ref().ok_or(Error::ClosedChannel)
    }

    pub fn get_mut(&mut self) -> Result<&mut S> {
        self.inner.as_mut().ok_or(Error::ClosedChannel)
    }

    /// Take the endpoint back; fails once closed
    pub fn into_inner(mut self) -> Result<S> {
        self.inner.take().ok_or(Error::ClosedChannel)
    }
}

impl<S: Write> StreamChannel<S> {
    /// Flush buffered output, then close
    pub fn close_flush(&mut self) -> Result<()> {
        if let Some(inner) = self.inner.as_mut() {
            inner.flush()?;
        }
        self.close()
    }
}

impl<S> Channel for StreamChannel<S> {
    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn close(&mut self) -> Result<()> {
        self.inner = None;
        Ok(())
    }
}

impl<S: Read> ReadableChannel for StreamChannel<S> {
    fn read(&mut self, dst: &mut ByteBuffer) -> Result<Option<usize>> {
        read_into(self.get_mut()?, dst)
    }
}

impl<S: Write> WritableChannel for StreamChannel<S> {
    fn write(&mut self, src: &mut ByteBuffer) -> Result<usize> {
        write_from(self.get_mut()?, src)
    }
}

impl<S: Read> ScatteringChannel for StreamChannel<S> {}

impl<S: Write> GatheringChannel for StreamChannel<S> {}
