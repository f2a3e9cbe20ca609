//! Wire protocol error types.

use thiserror::Error;

/// Result type for wire protocol operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors that can occur during wire protocol operations.
///
/// Read-side variants leave the byte stream in an unknown position, so the
/// connection that produced them must be closed.
#[derive(Debug, Error)]
pub enum WireError {
    /// The first byte of a length prefix matches no size class.
    #[error("invalid length prefix: 0x{0:02x}")]
    InvalidLengthPrefix(u8),

    /// The peer closed the connection mid-frame.
    #[error("connection closed by remote end")]
    ConnectionClosed,

    /// Word exceeds the reader's size limit.
    #[error("word too large: {size} bytes (max {max})")]
    WordTooLarge { size: u32, max: u32 },

    /// An outbound word is longer than any length prefix can express.
    #[error("word of {0} bytes exceeds the largest encodable length")]
    WordLengthOverflow(usize),

    /// A reply sentence started with an unrecognised tag.
    #[error("unknown reply tag: {0:?}")]
    UnknownReplyTag(String),

    /// A reply sentence carried no words at all.
    #[error("reply sentence has no tag")]
    MissingReplyTag,

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
