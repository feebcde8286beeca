//! Error types for the lzp3 compressor.
//!
//! Every error is terminal for the call that produced it. Nothing inside the codec retries.

use thiserror::Error;

/// Error variants for compression and decompression.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad magic, malformed size prefix, or a missing header byte.
    #[error("format error: {0}")]
    FormatError(String),

    /// The compressed data decoded to something no encoder could have produced.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Seek or tell was called on a stream that does not support it.
    #[error("stream is not seekable")]
    NotSeekable,

    /// The range coder accumulated more outstanding carry bytes than it can count.
    #[error("too many bytes outstanding in the range coder")]
    CapacityExceeded,

    /// The declared output size and the decoded data disagree.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// An error from a wrapped `std::io` reader or writer.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for lzp3 operations.
pub type Result<T> = std::result::Result<T, Error>;
