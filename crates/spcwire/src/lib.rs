//! XPC-style message serialization for Mach IPC.
//!
//! spcwire turns typed value trees into the byte layout XPC peers expect inside
//! a Mach message, and back. Handles (file descriptors, send and receive
//! rights) travel as port descriptors next to the content.
//!
//! # Crate Structure
//!
//! - [`codec`]: Value model, content writer and bounds-checked reader
//! - [`envelope`]: Mach header, descriptor section, `serialize`/`deserialize`

/// Re-export codec types.
pub mod codec {
    pub use spcwire_codec::*;
}

/// Re-export envelope types.
pub mod envelope {
    pub use spcwire_envelope::*;
}

pub use spcwire_codec::{Dictionary, Port, PortDisposition, Value};
pub use spcwire_envelope::{deserialize, serialize, EnvelopeError, Message};
