use bytes::BytesMut;

use crate::error::{DecodeError, EncodeError};
use crate::reader::Reader;
use crate::value::{Port, Value};
use crate::writer::Writer;

/// Content magic: "CPX@" followed by the wire version.
pub const MAGIC: [u8; 4] = *b"CPX@";

/// Wire version written after [`MAGIC`].
pub const WIRE_VERSION: u32 = 5;

/// Magic (4) + version (4).
pub const PREAMBLE_SIZE: usize = 8;

/// Default maximum container nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Zero bytes needed after `len` bytes to reach a 4-byte boundary.
pub fn padding_for(len: usize) -> usize {
    (4 - (len % 4)) % 4
}

/// `len` rounded up to the next multiple of 4.
pub fn padded_len(len: usize) -> usize {
    len + padding_for(len)
}

/// The 8-byte content preamble.
pub fn preamble() -> [u8; PREAMBLE_SIZE] {
    let mut out = [0u8; PREAMBLE_SIZE];
    out[..4].copy_from_slice(&MAGIC);
    out[4..].copy_from_slice(&WIRE_VERSION.to_le_bytes());
    out
}

/// Configuration shared by the writer and reader.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Maximum container nesting. Default: 64.
    pub max_depth: usize,
    /// Check array/dictionary byte-size prefixes against the bytes actually
    /// consumed. Default: true.
    pub validate_sizes: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            validate_sizes: true,
        }
    }
}

/// Encode a single tagged value, returning content bytes and collected ports.
pub fn encode_value(value: &Value, config: &CodecConfig) -> Result<(BytesMut, Vec<Port>), EncodeError> {
    let mut writer = Writer::with_config(64, config);
    writer.encode_value(value)?;
    Ok(writer.finish())
}

/// Decode a single tagged value from `bytes`, resolving handles against `ports`.
///
/// Trailing bytes after the value are ignored.
pub fn decode_value(bytes: &[u8], ports: Vec<Port>, config: &CodecConfig) -> Result<Value, DecodeError> {
    let mut reader = Reader::with_config(bytes, ports, config.clone());
    reader.decode_value()
}
