use bytes::{BufMut, BytesMut};
use spcwire_codec::{PortDisposition, Reader};

use crate::error::Result;

/// `mach_msg_header_t`: bits, size, remote, local, voucher, id.
pub const HEADER_SIZE: usize = 24;

/// `mach_msg_body_t`: descriptor count.
pub const BODY_SIZE: usize = 4;

pub const MACH_MSGH_BITS_REMOTE_MASK: u32 = 0x0000_001f;
pub const MACH_MSGH_BITS_LOCAL_MASK: u32 = 0x0000_1f00;
pub const MACH_MSGH_BITS_COMPLEX: u32 = 0x8000_0000;

/// Message id the peer uses to report an interrupted connection.
pub const MSGID_CONNECTION_INTERRUPTED: u32 = 71;

/// Fixed Mach message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachHeader {
    /// Disposition bits for both ports plus the complex flag.
    pub bits: u32,
    /// Total message size in bytes, header included.
    pub size: u32,
    pub remote_port: u32,
    pub local_port: u32,
    pub voucher_port: u32,
    pub id: u32,
}

impl MachHeader {
    /// Fold port dispositions and the complex flag into header bits.
    pub fn compose_bits(remote: PortDisposition, local: PortDisposition, complex: bool) -> u32 {
        let mut bits = (u32::from(remote.raw()) & MACH_MSGH_BITS_REMOTE_MASK)
            | ((u32::from(local.raw()) << 8) & MACH_MSGH_BITS_LOCAL_MASK);
        if complex {
            bits |= MACH_MSGH_BITS_COMPLEX;
        }
        bits
    }

    pub fn is_complex(&self) -> bool {
        self.bits & MACH_MSGH_BITS_COMPLEX != 0
    }

    pub fn remote_disposition_raw(&self) -> u32 {
        self.bits & MACH_MSGH_BITS_REMOTE_MASK
    }

    pub fn local_disposition_raw(&self) -> u32 {
        (self.bits & MACH_MSGH_BITS_LOCAL_MASK) >> 8
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            bits: reader.read_u32()?,
            size: reader.read_u32()?,
            remote_port: reader.read_u32()?,
            local_port: reader.read_u32()?,
            voucher_port: reader.read_u32()?,
            id: reader.read_u32()?,
        })
    }

    pub fn write(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u32_le(self.bits);
        dst.put_u32_le(self.size);
        dst.put_u32_le(self.remote_port);
        dst.put_u32_le(self.local_port);
        dst.put_u32_le(self.voucher_port);
        dst.put_u32_le(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_layout() {
        let bits = MachHeader::compose_bits(
            PortDisposition::CopySend,
            PortDisposition::MakeSendOnce,
            true,
        );
        assert_eq!(bits, 0x8000_1513);

        let header = MachHeader {
            bits,
            ..MachHeader::default()
        };
        assert!(header.is_complex());
        assert_eq!(header.remote_disposition_raw(), 19);
        assert_eq!(header.local_disposition_raw(), 21);
    }

    #[test]
    fn simple_bits_have_no_complex_flag() {
        let bits = MachHeader::compose_bits(PortDisposition::CopySend, PortDisposition::None, false);
        assert_eq!(bits, 19);
        assert!(!MachHeader { bits, ..MachHeader::default() }.is_complex());
    }

    #[test]
    fn write_then_read() {
        let header = MachHeader {
            bits: 0x13,
            size: 48,
            remote_port: 0x1103,
            local_port: 0x2207,
            voucher_port: 0,
            id: 0x1000_0000,
        };
        let mut buf = BytesMut::new();
        header.write(&mut buf);
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(&buf[4..8], &48u32.to_le_bytes());

        let parsed = MachHeader::read(&mut Reader::new(&buf)).unwrap();
        assert_eq!(parsed, header);
    }
}
