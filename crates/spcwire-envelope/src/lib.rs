//! Mach message envelopes for XPC-style payloads.
//!
//! An envelope wraps encoded content in a kernel message:
//! - A 24-byte Mach header carrying port names, dispositions, id and size
//! - For complex messages only, a descriptor count and one port descriptor per
//!   handle value found in the content
//! - The content itself: "CPX@", wire version 5, then a dictionary value
//!
//! Sending and receiving the envelope through the kernel is left to the caller.

pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod header;
pub mod message;

pub use descriptor::{Descriptor, OOL_DESCRIPTOR_SIZE, PORT_DESCRIPTOR_SIZE};
pub use envelope::{
    deserialize, deserialize_with_config, parse_envelope, parse_envelope_with_config, serialize,
    serialize_with_config, EnvelopeInfo,
};
pub use error::{EnvelopeError, Result};
pub use header::{MachHeader, BODY_SIZE, HEADER_SIZE, MACH_MSGH_BITS_COMPLEX, MSGID_CONNECTION_INTERRUPTED};
pub use message::{EnvelopeConfig, Message, DEFAULT_MAX_MESSAGE_SIZE};
