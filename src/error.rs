//! Error types for encoding and decoding animated WebP containers.

use thiserror::Error;

/// Errors that can occur while accumulating, encoding or decoding frames.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid dimensions or options.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A frame buffer does not match `width * height * 4`.
    #[error("Frame buffer is {actual} bytes, expected {expected}")]
    FrameShape {
        /// Required buffer length.
        expected: usize,
        /// Length of the buffer that was supplied.
        actual: usize,
    },

    /// The animation was finished without any frames.
    #[error("No frames to encode")]
    EmptyAnimation,

    /// The pixel codec failed to compress or decompress a frame.
    #[error("Codec error: {0}")]
    Codec(String),

    /// The data is not a well-formed WebP container.
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// A chunk declares more bytes than the buffer holds.
    #[error("Truncated data: {needed} bytes needed at offset {offset}, {available} available")]
    TruncatedData {
        /// Byte offset where the read started.
        offset: usize,
        /// Bytes required from that offset.
        needed: usize,
        /// Bytes actually left in the buffer.
        available: usize,
    },

    /// A frame uses a bitstream variant this crate does not decode.
    #[error("Unsupported codec chunk: {:?}", String::from_utf8_lossy(.0))]
    UnsupportedCodec([u8; 4]),

    /// A decode limit was exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Writing the output file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
