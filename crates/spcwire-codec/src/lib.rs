//! Type-tagged XPC value encoding.
//!
//! Every value is written as a 4-byte little-endian type tag followed by a
//! tag-specific payload:
//! - scalars as fixed-width little-endian fields
//! - strings and blobs with a 32-bit length and zero padding to 4 bytes
//! - arrays and dictionaries with a 32-bit byte size, a 32-bit count, then
//!   their elements
//! - file descriptors and ports as the tag alone; the port itself travels in
//!   the envelope's descriptor section, matched up by traversal order
//!
//! Decoding never panics on hostile input: every read is bounds-checked.

pub mod codec;
pub mod error;
pub mod reader;
pub mod value;
pub mod writer;

pub use codec::{
    decode_value, encode_value, padded_len, padding_for, preamble, CodecConfig, DEFAULT_MAX_DEPTH,
    MAGIC, PREAMBLE_SIZE, WIRE_VERSION,
};
pub use error::{DecodeError, EncodeError, Result};
pub use reader::{PortCursor, Reader};
pub use value::{Array, Dictionary, ParseDispositionError, Port, PortDisposition, Value, ValueType};
pub use writer::Writer;

pub use bytes::Bytes;
pub use uuid::Uuid;
