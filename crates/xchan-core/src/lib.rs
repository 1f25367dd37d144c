//! xchan - Buffered channel I/O
//!
//! Cursor-based byte buffers (heap, direct or file-mapped), blocking channels
//! over files, sockets and arbitrary streams, kernel-assisted transfers
//! between them, scatter/gather I/O and charset transcoding.

pub mod buffer;
pub mod channel;
pub mod charset;
pub mod config;
pub mod cursor;
pub mod error;
mod mapped;
pub mod scatter;
mod shm;
pub mod storage;
pub mod transfer;
#[cfg(all(feature = "zero-copy", target_os = "linux", target_pointer_width = "64"))]
mod zero_copy;

pub use buffer::ByteBuffer;
pub use channel::{
    Channel, FileChannel, GatheringChannel, OpenOption, ReadableChannel, ScatteringChannel,
    SeekableChannel, ServerSocketChannel, SocketChannel, StreamChannel, WritableChannel,
};
pub use charset::{
    available_charsets, Charset, CharsetDecoder, CharsetEncoder, CodecConfig, CoderResult,
    CodingErrorAction,
};
pub use config::{TransferConfig, DEFAULT_BUFFER_SIZE};
pub use error::{Error, Result};
pub use scatter::{read_scatter, write_gather};
pub use storage::{MapMode, StorageType};
pub use transfer::{copy, transfer_from, transfer_to, CopyStats};
