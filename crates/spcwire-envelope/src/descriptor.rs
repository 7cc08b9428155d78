use bytes::{BufMut, BytesMut};
use spcwire_codec::{Port, PortDisposition, Reader};

use crate::error::{EnvelopeError, Result};

pub const MACH_MSG_PORT_DESCRIPTOR: u8 = 0;
pub const MACH_MSG_OOL_DESCRIPTOR: u8 = 1;
pub const MACH_MSG_OOL_PORTS_DESCRIPTOR: u8 = 2;

/// `mach_msg_port_descriptor_t`: name, pad1, pad2, disposition, type.
pub const PORT_DESCRIPTOR_SIZE: usize = 12;

/// 64-bit `mach_msg_ool_descriptor_t` and `mach_msg_ool_ports_descriptor_t`.
pub const OOL_DESCRIPTOR_SIZE: usize = 16;

// Every descriptor layout keeps its type byte at the same offset.
const TYPE_OFFSET: usize = 11;

/// One entry of a complex message's descriptor section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor {
    /// A port right. The only kind that carries handle values.
    Port(Port),
    /// Out-of-line memory. Parsed so it can be skipped.
    Ool { address: u64, size: u32 },
    /// Out-of-line port array. Parsed so it can be skipped.
    OolPorts { address: u64, count: u32 },
}

impl Descriptor {
    pub fn kind(&self) -> u8 {
        match self {
            Descriptor::Port(_) => MACH_MSG_PORT_DESCRIPTOR,
            Descriptor::Ool { .. } => MACH_MSG_OOL_DESCRIPTOR,
            Descriptor::OolPorts { .. } => MACH_MSG_OOL_PORTS_DESCRIPTOR,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Descriptor::Port(_) => "port",
            Descriptor::Ool { .. } => "ool",
            Descriptor::OolPorts { .. } => "ool-ports",
        }
    }

    pub fn wire_size(&self) -> usize {
        match self {
            Descriptor::Port(_) => PORT_DESCRIPTOR_SIZE,
            Descriptor::Ool { .. } | Descriptor::OolPorts { .. } => OOL_DESCRIPTOR_SIZE,
        }
    }

    pub fn port(&self) -> Option<Port> {
        match self {
            Descriptor::Port(port) => Some(*port),
            _ => None,
        }
    }

    /// Parse the next descriptor, dispatching on its type byte.
    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let kind = reader.peek_raw(TYPE_OFFSET + 1)?[TYPE_OFFSET];
        match kind {
            MACH_MSG_PORT_DESCRIPTOR => {
                let name = reader.read_u32()?;
                let _pad1 = reader.read_u32()?;
                let _pad2 = reader.read_u16()?;
                let disposition = PortDisposition::from_raw(u32::from(reader.read_u8()?))?;
                let _kind = reader.read_u8()?;
                Ok(Descriptor::Port(Port::new(name, disposition)))
            }
            MACH_MSG_OOL_DESCRIPTOR => {
                let address = reader.read_u64()?;
                // deallocate, copy, pad1, type
                reader.read_raw(4)?;
                let size = reader.read_u32()?;
                Ok(Descriptor::Ool { address, size })
            }
            MACH_MSG_OOL_PORTS_DESCRIPTOR => {
                let address = reader.read_u64()?;
                // deallocate, copy, disposition, type
                reader.read_raw(4)?;
                let count = reader.read_u32()?;
                Ok(Descriptor::OolPorts { address, count })
            }
            other => Err(EnvelopeError::UnsupportedDescriptor(other)),
        }
    }

    /// Write a port descriptor. Out-of-line kinds are never produced.
    pub fn write_port(port: Port, dst: &mut BytesMut) {
        dst.reserve(PORT_DESCRIPTOR_SIZE);
        dst.put_u32_le(port.name);
        dst.put_u32_le(0);
        dst.put_u16_le(0);
        dst.put_u8(port.disposition.raw());
        dst.put_u8(MACH_MSG_PORT_DESCRIPTOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ool_bytes(kind: u8, address: u64, size: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&address.to_le_bytes());
        buf.extend_from_slice(&[1, 0, 0, kind]);
        buf.extend_from_slice(&size.to_le_bytes());
        buf
    }

    #[test]
    fn port_descriptor_layout() {
        let port = Port::new(7, PortDisposition::MoveSend);
        let mut buf = BytesMut::new();
        Descriptor::write_port(port, &mut buf);

        assert_eq!(buf.len(), PORT_DESCRIPTOR_SIZE);
        assert_eq!(&buf[..4], &7u32.to_le_bytes());
        assert_eq!(buf[10], 17);
        assert_eq!(buf[TYPE_OFFSET], MACH_MSG_PORT_DESCRIPTOR);

        let mut reader = Reader::new(&buf);
        assert_eq!(Descriptor::read(&mut reader).unwrap(), Descriptor::Port(port));
        assert!(reader.is_empty());
    }

    #[test]
    fn ool_descriptors_are_consumed() {
        let mut buf = ool_bytes(MACH_MSG_OOL_DESCRIPTOR, 0x1000, 64);
        buf.extend(ool_bytes(MACH_MSG_OOL_PORTS_DESCRIPTOR, 0x2000, 3));

        let mut reader = Reader::new(&buf);
        let first = Descriptor::read(&mut reader).unwrap();
        let second = Descriptor::read(&mut reader).unwrap();

        assert_eq!(
            first,
            Descriptor::Ool {
                address: 0x1000,
                size: 64
            }
        );
        assert_eq!(
            second,
            Descriptor::OolPorts {
                address: 0x2000,
                count: 3
            }
        );
        assert_eq!(first.wire_size() + second.wire_size(), buf.len());
        assert!(reader.is_empty());
    }

    #[test]
    fn unknown_descriptor_kind_is_rejected() {
        let buf = ool_bytes(4, 0, 0);
        let err = Descriptor::read(&mut Reader::new(&buf)).unwrap_err();
        assert!(matches!(err, EnvelopeError::UnsupportedDescriptor(4)));
    }

    #[test]
    fn unknown_disposition_is_rejected() {
        let mut buf = BytesMut::new();
        Descriptor::write_port(Port::new(1, PortDisposition::MoveSend), &mut buf);
        buf[10] = 99;
        let err = Descriptor::read(&mut Reader::new(&buf)).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Decode(spcwire_codec::DecodeError::UnknownDisposition(99))
        ));
    }

    #[test]
    fn short_descriptor_is_truncated() {
        let buf = [0u8; 8];
        let err = Descriptor::read(&mut Reader::new(&buf)).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Decode(spcwire_codec::DecodeError::Truncated { .. })
        ));
    }
}
