//! Blocking TCP channels

use super::{
    read_into, write_from, Channel, GatheringChannel, ReadableChannel, ScatteringChannel,
    WritableChannel,
};
use crate::buffer::ByteBuffer;
use crate::{scatter, Error, Result};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::fd::{AsFd, BorrowedFd};

/// Connected TCP stream
pub struct SocketChannel {
    stream: Option<TcpStream>,
}

impl SocketChannel {
    /// Connect to `addr`, blocking until established
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        log::debug!("connected to {:?}", stream.peer_addr().ok());
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    fn stream(&self) -> Result<&TcpStream> {
        self.stream.as_ref().ok_or(Error::ClosedChannel)
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream()?.peer_addr()?)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream()?.local_addr()?)
    }

    /// Signal end-of-stream to the peer while keeping the read half open
    pub fn shutdown_output(&self) -> Result<()> {
        self.stream()?.shutdown(Shutdown::Write)?;
        Ok(())
    }
}

impl Channel for SocketChannel {
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            log::debug!("closing socket {:?}", stream.peer_addr().ok());
            // The peer may already be gone; dropping still releases the fd
            let _ = stream.shutdown(Shutdown::Both);
        }
        Ok(())
    }

    #[cfg(unix)]
    fn descriptor(&self) -> Option<BorrowedFd<'_>> {
        self.stream.as_ref().map(|s| s.as_fd())
    }
}

impl ReadableChannel for SocketChannel {
    fn read(&mut self, dst: &mut ByteBuffer) -> Result<Option<usize>> {
        let mut stream = self.stream()?;
        read_into(&mut stream, dst)
    }
}

impl WritableChannel for SocketChannel {
    fn write(&mut self, src: &mut ByteBuffer) -> Result<usize> {
        let mut stream = self.stream()?;
        write_from(&mut stream, src)
    }
}

impl ScatteringChannel for SocketChannel {
    fn read_scatter(&mut self, dsts: &mut [ByteBuffer]) -> Result<Option<u64>> {
        let mut stream = self.stream()?;
        scatter::read_vectored(&mut stream, dsts)
    }
}

impl GatheringChannel for SocketChannel {
    fn write_gather(&mut self, srcs: &mut [ByteBuffer]) -> Result<u64> {
        let mut stream = self.stream()?;
        scatter::write_vectored(&mut stream, srcs)
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Listening TCP socket handing out [`SocketChannel`]s
pub struct ServerSocketChannel {
    listener: Option<TcpListener>,
}

impl ServerSocketChannel {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        log::debug!("listening on {:?}", listener.local_addr().ok());
        Ok(Self {
            listener: Some(listener),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        let listener = self.listener.as_ref().ok_or(Error::ClosedChannel)?;
        Ok(listener.local_addr()?)
    }

    /// Block until a client connects
    pub fn accept(&self) -> Result<SocketChannel> {
        let listener = self.listener.as_ref().ok_or(Error::ClosedChannel)?;
        let (stream, peer) = listener.accept()?;
        log::debug!("accepted {}", peer);
        Ok(SocketChannel::from_stream(stream))
    }
}

impl Channel for ServerSocketChannel {
    fn is_open(&self) -> bool {
        self.listener.is_some()
    }

    fn close(&mut self) -> Result<()> {
        self.listener = None;
        Ok(())
    }
}
