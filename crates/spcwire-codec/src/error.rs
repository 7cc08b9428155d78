/// Errors that can occur while encoding a value tree.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// A string or dictionary key contains a NUL byte and cannot be written as a C string.
    #[error("string contains an interior NUL byte at position {position}")]
    InteriorNul { position: usize },

    /// A length does not fit the 32-bit wire field.
    #[error("{what} too large for the wire format ({size} bytes)")]
    TooLarge { what: &'static str, size: usize },

    /// The value tree nests deeper than the configured limit.
    #[error("value nesting exceeds depth limit {0}")]
    DepthExceeded(usize),
}

/// Errors that can occur while decoding content bytes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A read ran past the end of the input.
    #[error("truncated input at offset {offset}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// The type tag does not name a known value kind.
    #[error("unknown value type 0x{tag:x} at offset {offset}")]
    UnknownType { tag: u32, offset: usize },

    /// No NUL terminator before the end of the input.
    #[error("unterminated string at offset {offset}")]
    UnterminatedString { offset: usize },

    /// A string or key is not valid UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// A container's byte-size prefix disagrees with its contents.
    #[error("container size mismatch: declared {declared} bytes, consumed {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    /// A dictionary repeats a key.
    #[error("duplicate dictionary key {0:?}")]
    DuplicateKey(String),

    /// The input nests deeper than the configured limit.
    #[error("value nesting exceeds depth limit {0}")]
    DepthExceeded(usize),

    /// A port disposition byte is not a known Mach right transfer.
    #[error("unknown port disposition {0}")]
    UnknownDisposition(u32),
}

pub type Result<T, E = DecodeError> = std::result::Result<T, E>;
