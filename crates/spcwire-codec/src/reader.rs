use bytes::Bytes;
use uuid::Uuid;

use crate::codec::{padding_for, CodecConfig};
use crate::error::{DecodeError, Result};
use crate::value::{Array, Dictionary, Port, Value, ValueType};

/// Positional cursor over the ports extracted from an envelope's descriptors.
///
/// Handle values consume ports in traversal order, mirroring the order in
/// which [`Writer`](crate::Writer) collected them.
#[derive(Debug, Clone, Default)]
pub struct PortCursor {
    ports: Vec<Port>,
    next: usize,
}

impl PortCursor {
    pub fn new(ports: Vec<Port>) -> Self {
        Self { ports, next: 0 }
    }

    /// Next unconsumed port, or `None` once the list is exhausted.
    pub fn next_port(&mut self) -> Option<Port> {
        let port = self.ports.get(self.next).copied()?;
        self.next += 1;
        Some(port)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Ports not yet handed out.
    pub fn remaining(&self) -> usize {
        self.ports.len() - self.next
    }
}

/// Bounds-checked decoder over a borrowed byte range.
///
/// Every read is checked against the end of the input; running out of bytes is
/// a [`DecodeError::Truncated`], never a panic.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    ports: PortCursor,
    config: CodecConfig,
}

impl<'a> Reader<'a> {
    /// Create a reader with no ports and default configuration.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_config(buf, Vec::new(), CodecConfig::default())
    }

    pub fn with_ports(buf: &'a [u8], ports: Vec<Port>) -> Self {
        Self::with_config(buf, ports, CodecConfig::default())
    }

    pub fn with_config(buf: &'a [u8], ports: Vec<Port>, config: CodecConfig) -> Self {
        Self {
            buf,
            pos: 0,
            ports: PortCursor::new(ports),
            config,
        }
    }

    /// Replace the port list. Used once descriptors have been parsed.
    pub fn set_ports(&mut self, ports: Vec<Port>) {
        self.ports = PortCursor::new(ports);
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn ports(&self) -> &PortCursor {
        &self.ports
    }

    /// Look at the next `n` bytes without consuming them.
    pub fn peek_raw(&self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.truncated(n));
        }
        Ok(&self.buf[self.pos..self.pos + n])
    }

    /// Consume exactly `n` bytes.
    pub fn read_raw(&mut self, n: usize) -> Result<&'a [u8]> {
        let raw = self.peek_raw(n)?;
        self.pos += n;
        Ok(raw)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let raw = self.read_raw(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(raw);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// Read `n` bytes and skip the alignment padding after them.
    pub fn read_padded(&mut self, n: usize) -> Result<&'a [u8]> {
        let raw = self.read_raw(n + padding_for(n))?;
        Ok(&raw[..n])
    }

    /// Read a NUL-terminated, padded string.
    pub fn read_string(&mut self) -> Result<&'a str> {
        let offset = self.pos;
        let nul = self.buf[self.pos..]
            .iter()
            .position(|b| *b == 0)
            .ok_or(DecodeError::UnterminatedString { offset })?;
        let raw = self.read_padded(nul + 1)?;
        std::str::from_utf8(&raw[..nul]).map_err(|_| DecodeError::InvalidUtf8 { offset })
    }

    /// Next port from the descriptor list, or [`Port::NULL`] once exhausted.
    pub fn next_port(&mut self) -> Port {
        match self.ports.next_port() {
            Some(port) => port,
            None => {
                tracing::warn!(
                    offset = self.pos,
                    available = self.ports.len(),
                    "handle value without matching port descriptor"
                );
                Port::NULL
            }
        }
    }

    pub fn decode_value(&mut self) -> Result<Value> {
        self.decode_value_at(0)
    }

    /// Decode an array body (size, count, elements) following its type tag.
    pub fn decode_array(&mut self) -> Result<Array> {
        self.decode_array_at(0)
    }

    /// Decode a dictionary body (size, count, entries) following its type tag.
    pub fn decode_dict(&mut self) -> Result<Dictionary> {
        self.decode_dict_at(0)
    }

    fn decode_value_at(&mut self, depth: usize) -> Result<Value> {
        let offset = self.pos;
        let tag = self.read_u32()?;
        let ty = ValueType::from_tag(tag).ok_or(DecodeError::UnknownType { tag, offset })?;

        let value = match ty {
            ValueType::Null => Value::Null,
            ValueType::Bool => Value::Bool(self.read_u32()? != 0),
            ValueType::UInt64 => Value::UInt64(self.read_u64()?),
            ValueType::Int64 => Value::Int64(self.read_i64()?),
            ValueType::Double => Value::Double(self.read_f64()?),
            ValueType::String => {
                let declared = self.read_u32()?;
                let s = self.read_string()?;
                if declared as usize != s.len() + 1 {
                    tracing::debug!(
                        offset,
                        declared,
                        actual = s.len() + 1,
                        "string length field disagrees with terminator"
                    );
                }
                Value::String(s.to_owned())
            }
            ValueType::Array => Value::Array(self.decode_array_at(depth)?),
            ValueType::Dict => Value::Dict(self.decode_dict_at(depth)?),
            ValueType::FileHandle => Value::FileHandle(self.next_port()),
            ValueType::SendHandle => Value::SendHandle(self.next_port()),
            ValueType::RecvHandle => Value::RecvHandle(self.next_port()),
            ValueType::Uuid => Value::Uuid(Uuid::from_bytes(self.read_array()?)),
            ValueType::Data => {
                let size = self.read_u32()? as usize;
                Value::Data(Bytes::copy_from_slice(self.read_padded(size)?))
            }
        };
        Ok(value)
    }

    fn decode_array_at(&mut self, depth: usize) -> Result<Array> {
        let (declared, start) = self.begin_sized(depth)?;
        let count = self.read_u32()? as usize;
        let mut array = Vec::with_capacity(self.bounded_capacity(count));
        for _ in 0..count {
            array.push(self.decode_value_at(depth + 1)?);
        }
        self.end_sized(declared, start)?;
        Ok(array)
    }

    fn decode_dict_at(&mut self, depth: usize) -> Result<Dictionary> {
        let (declared, start) = self.begin_sized(depth)?;
        let count = self.read_u32()? as usize;
        let mut dict = Dictionary::with_capacity(self.bounded_capacity(count));
        for _ in 0..count {
            let key = self.read_string()?;
            if dict.contains_key(key) {
                return Err(DecodeError::DuplicateKey(key.to_owned()));
            }
            let value = self.decode_value_at(depth + 1)?;
            dict.insert(key, value);
        }
        self.end_sized(declared, start)?;
        Ok(dict)
    }

    fn begin_sized(&mut self, depth: usize) -> Result<(usize, usize)> {
        if depth >= self.config.max_depth {
            return Err(DecodeError::DepthExceeded(self.config.max_depth));
        }
        let declared = self.read_u32()? as usize;
        if self.config.validate_sizes && declared > self.remaining() {
            return Err(self.truncated(declared));
        }
        Ok((declared, self.pos))
    }

    fn end_sized(&self, declared: usize, start: usize) -> Result<()> {
        let actual = self.pos - start;
        if self.config.validate_sizes && actual != declared {
            return Err(DecodeError::SizeMismatch { declared, actual });
        }
        Ok(())
    }

    // Every encoded value takes at least 4 bytes, so a count larger than that
    // cannot be honest; don't let it drive the allocation.
    fn bounded_capacity(&self, count: usize) -> usize {
        count.min(self.remaining() / 4)
    }

    fn truncated(&self, needed: usize) -> DecodeError {
        DecodeError::Truncated {
            offset: self.pos,
            needed,
            remaining: self.remaining(),
        }
    }
}
