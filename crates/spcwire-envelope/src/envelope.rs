use bytes::{BufMut, Bytes, BytesMut};
use spcwire_codec::{preamble, Port, PortDisposition, Reader, Value, ValueType, Writer, MAGIC, WIRE_VERSION};
use tracing::{debug, trace, warn};

use crate::descriptor::{Descriptor, PORT_DESCRIPTOR_SIZE};
use crate::error::{EnvelopeError, Result};
use crate::header::{MachHeader, BODY_SIZE, HEADER_SIZE, MSGID_CONNECTION_INTERRUPTED};
use crate::message::{EnvelopeConfig, Message};

// Initial content capacity per top-level entry.
const BYTES_PER_ENTRY_HINT: usize = 32;

/// Layout of a parsed envelope, without its content decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeInfo {
    pub header: MachHeader,
    /// Descriptors in wire order. Empty for simple messages.
    pub descriptors: Vec<Descriptor>,
    /// Offset of the content bytes from the start of the envelope.
    pub content_offset: usize,
    pub content_len: usize,
}

impl EnvelopeInfo {
    /// Ports from PORT descriptors, in wire order.
    pub fn ports(&self) -> Vec<Port> {
        self.descriptors.iter().filter_map(Descriptor::port).collect()
    }

    /// The content slice of the envelope this info was parsed from.
    pub fn content<'a>(&self, envelope: &'a [u8]) -> &'a [u8] {
        &envelope[self.content_offset..self.content_offset + self.content_len]
    }
}

/// Encode a message into a Mach envelope with default configuration.
pub fn serialize(msg: &Message) -> Result<Bytes> {
    serialize_with_config(msg, &EnvelopeConfig::default())
}

/// Encode a message into a Mach envelope.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────────────────┬──────────────────────────┐
/// │ Header (24B) │ Count (4B) + descriptors     │ "CPX@" 5 (8B) + dict     │
/// │              │ (12B each, complex only)     │                          │
/// └──────────────┴──────────────────────────────┴──────────────────────────┘
/// ```
/// The descriptor section is present only when the content holds handle
/// values; the complex bit in the header marks it.
pub fn serialize_with_config(msg: &Message, config: &EnvelopeConfig) -> Result<Bytes> {
    let mut writer = Writer::with_config(msg.content.len() * BYTES_PER_ENTRY_HINT, &config.codec);
    writer.write_raw(&preamble());
    writer.write_u32(ValueType::Dict.tag());
    writer.encode_dict(&msg.content)?;
    let (content, ports) = writer.finish();

    let complex = !ports.is_empty();
    let descriptor_len = if complex {
        BODY_SIZE + ports.len() * PORT_DESCRIPTOR_SIZE
    } else {
        0
    };
    let total = HEADER_SIZE + descriptor_len + content.len();
    let size = checked_size(total, config)?;

    let header = MachHeader {
        bits: MachHeader::compose_bits(
            msg.remote_port.disposition,
            msg.local_port.disposition,
            complex,
        ),
        size,
        remote_port: msg.remote_port.name,
        local_port: msg.local_port.name,
        voucher_port: 0,
        id: msg.id,
    };

    let mut out = BytesMut::with_capacity(total);
    header.write(&mut out);
    if complex {
        // Bounded by `size`, which fits in u32.
        out.put_u32_le(ports.len() as u32);
        for port in &ports {
            Descriptor::write_port(*port, &mut out);
        }
    }
    out.put_slice(&content);

    debug!(
        id = msg.id,
        size = total,
        descriptors = ports.len(),
        complex,
        "serialized envelope"
    );
    Ok(out.freeze())
}

/// Decode a Mach envelope into a message with default configuration.
pub fn deserialize(buf: &[u8]) -> Result<Message> {
    deserialize_with_config(buf, &EnvelopeConfig::default())
}

/// Decode a Mach envelope into a message.
///
/// Bytes past the header's declared size (such as a kernel trailer) are
/// ignored. Out-of-line descriptors are skipped; their data is not delivered.
pub fn deserialize_with_config(buf: &[u8], config: &EnvelopeConfig) -> Result<Message> {
    let header = read_header(buf, config)?;
    if header.id == MSGID_CONNECTION_INTERRUPTED {
        warn!("peer reported connection interrupted");
        return Err(EnvelopeError::ConnectionInterrupted);
    }

    let info = read_body(header, buf)?;
    for descriptor in info.descriptors.iter().filter(|d| d.port().is_none()) {
        warn!(kind = descriptor.kind_name(), "ignoring out-of-line descriptor");
    }

    let mut reader = Reader::with_config(info.content(buf), info.ports(), config.codec.clone());
    let magic = reader.read_raw(MAGIC.len())?;
    if magic != MAGIC.as_slice() {
        let mut found = [0u8; 4];
        found.copy_from_slice(magic);
        return Err(EnvelopeError::InvalidMagic { found });
    }
    let version = reader.read_u32()?;
    if version != WIRE_VERSION {
        return Err(EnvelopeError::UnsupportedVersion(version));
    }

    let content = match reader.decode_value()? {
        Value::Dict(dict) => dict,
        other => return Err(EnvelopeError::NotADictionary(other.value_type())),
    };
    if !reader.is_empty() {
        trace!(trailing = reader.remaining(), "ignoring bytes after content");
    }
    if reader.ports().remaining() > 0 {
        debug!(
            unused = reader.ports().remaining(),
            "port descriptors without matching handle values"
        );
    }

    Ok(Message {
        remote_port: Port::new(
            header.remote_port,
            PortDisposition::from_raw(header.remote_disposition_raw())?,
        ),
        local_port: Port::new(
            header.local_port,
            PortDisposition::from_raw(header.local_disposition_raw())?,
        ),
        id: header.id,
        content,
    })
}

/// Parse the header and descriptor section without decoding content.
pub fn parse_envelope(buf: &[u8]) -> Result<EnvelopeInfo> {
    parse_envelope_with_config(buf, &EnvelopeConfig::default())
}

pub fn parse_envelope_with_config(buf: &[u8], config: &EnvelopeConfig) -> Result<EnvelopeInfo> {
    let header = read_header(buf, config)?;
    read_body(header, buf)
}

fn checked_size(total: usize, config: &EnvelopeConfig) -> Result<u32> {
    if total > config.max_message_size {
        return Err(EnvelopeError::MessageTooLarge {
            size: total,
            max: config.max_message_size,
        });
    }
    u32::try_from(total).map_err(|_| EnvelopeError::MessageTooLarge {
        size: total,
        max: u32::MAX as usize,
    })
}

fn read_header(buf: &[u8], config: &EnvelopeConfig) -> Result<MachHeader> {
    if buf.len() < HEADER_SIZE {
        return Err(EnvelopeError::Truncated {
            declared: HEADER_SIZE,
            actual: buf.len(),
        });
    }
    let header = MachHeader::read(&mut Reader::new(buf))?;

    let size = header.size as usize;
    if size < HEADER_SIZE {
        return Err(EnvelopeError::MalformedHeader { size });
    }
    if size > config.max_message_size {
        return Err(EnvelopeError::MessageTooLarge {
            size,
            max: config.max_message_size,
        });
    }
    if size > buf.len() {
        return Err(EnvelopeError::Truncated {
            declared: size,
            actual: buf.len(),
        });
    }
    if buf.len() > size {
        trace!(trailer = buf.len() - size, "ignoring bytes past message size");
    }
    Ok(header)
}

fn read_body(header: MachHeader, buf: &[u8]) -> Result<EnvelopeInfo> {
    let body = &buf[HEADER_SIZE..header.size as usize];
    let mut reader = Reader::new(body);
    let mut descriptors = Vec::new();

    if header.is_complex() {
        let count = reader.read_u32()? as usize;
        descriptors.reserve(count.min(reader.remaining() / PORT_DESCRIPTOR_SIZE));
        for _ in 0..count {
            descriptors.push(Descriptor::read(&mut reader)?);
        }
    }

    Ok(EnvelopeInfo {
        header,
        descriptors,
        content_offset: HEADER_SIZE + reader.position(),
        content_len: reader.remaining(),
    })
}
