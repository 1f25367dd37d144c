//! Error types for xchan

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("buffer overflow: requested {requested} bytes, {remaining} remaining")]
    BufferOverflow { requested: usize, remaining: usize },

    #[error("buffer underflow: requested {requested} bytes, {remaining} remaining")]
    BufferUnderflow { requested: usize, remaining: usize },

    #[error("reset without a valid mark")]
    IllegalMark,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("access denied: buffer is read-only")]
    ReadOnly,

    #[error("channel is closed")]
    ClosedChannel,

    #[error("channel was not opened for reading")]
    NotReadable,

    #[error("channel was not opened for writing")]
    NotWritable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shared memory error: {0}")]
    SharedMemory(String),

    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),

    #[error("malformed input of length {length} at offset {offset}")]
    MalformedInput { offset: usize, length: usize },

    #[error("unmappable character {0:?}")]
    UnmappableCharacter(char),
}

impl Error {
    /// Whether the failure came from the environment rather than from a
    /// broken caller contract.
    ///
    /// Buffer-state, mark and codec errors are deterministic: retrying the
    /// same call fails the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io(_) | Error::SharedMemory(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
