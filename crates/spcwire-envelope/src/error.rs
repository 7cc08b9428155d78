use spcwire_codec::{DecodeError, EncodeError, ValueType};

/// Errors that can occur while building or parsing an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The buffer is shorter than the header or than the size the header declares.
    #[error("envelope truncated: expected {declared} bytes, buffer holds {actual}")]
    Truncated { declared: usize, actual: usize },

    /// The header's size field cannot describe a valid message.
    #[error("malformed header: message size {size} is smaller than the 24-byte header")]
    MalformedHeader { size: usize },

    /// The message exceeds the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The peer reported that the connection was interrupted.
    #[error("connection interrupted")]
    ConnectionInterrupted,

    /// The descriptor section holds a descriptor kind that cannot be parsed.
    #[error("unsupported descriptor type {0}")]
    UnsupportedDescriptor(u8),

    /// The content does not start with "CPX@".
    #[error("invalid content magic {found:?} (expected \"CPX@\")")]
    InvalidMagic { found: [u8; 4] },

    /// The content magic carries an unknown wire version.
    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u32),

    /// The top-level content value is not a dictionary.
    #[error("top-level value is {0}, expected dictionary")]
    NotADictionary(ValueType),

    /// Content or descriptor bytes failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The content dictionary failed to encode.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
