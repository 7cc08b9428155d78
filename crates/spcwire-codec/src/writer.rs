use bytes::{BufMut, BytesMut};

use crate::codec::{padding_for, CodecConfig};
use crate::error::EncodeError;
use crate::value::{Dictionary, Port, Value};

const DEFAULT_CAPACITY: usize = 256;

/// Serializes value trees into content bytes.
///
/// Handle values write only their type tag; the ports they carry are collected
/// in traversal order and returned by [`Writer::finish`] so the envelope can
/// emit matching descriptors.
#[derive(Debug)]
pub struct Writer {
    buf: BytesMut,
    ports: Vec<Port>,
    max_depth: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(capacity, &CodecConfig::default())
    }

    pub fn with_config(capacity: usize, config: &CodecConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            ports: Vec::new(),
            max_depth: config.max_depth,
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Ports collected so far, in traversal order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Make room for at least `n` more bytes without moving the write position.
    pub fn ensure_space(&mut self, n: usize) {
        self.buf.reserve(n);
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> usize {
        self.ensure_space(bytes.len());
        self.buf.put_slice(bytes);
        bytes.len()
    }

    /// Write `bytes` followed by zero padding up to a 4-byte boundary.
    pub fn write_padded(&mut self, bytes: &[u8]) -> usize {
        let padding = padding_for(bytes.len());
        self.ensure_space(bytes.len() + padding);
        self.buf.put_slice(bytes);
        self.buf.put_bytes(0, padding);
        bytes.len() + padding
    }

    /// Write a NUL-terminated, padded string.
    pub fn write_string(&mut self, s: &str) -> Result<usize, EncodeError> {
        if let Some(position) = s.bytes().position(|b| b == 0) {
            return Err(EncodeError::InteriorNul { position });
        }
        let len = s.len() + 1;
        let padding = padding_for(len);
        self.ensure_space(len + padding);
        self.buf.put_slice(s.as_bytes());
        self.buf.put_bytes(0, 1 + padding);
        Ok(len + padding)
    }

    pub fn write_u32(&mut self, value: u32) -> usize {
        self.ensure_space(4);
        self.buf.put_u32_le(value);
        4
    }

    pub fn write_u64(&mut self, value: u64) -> usize {
        self.ensure_space(8);
        self.buf.put_u64_le(value);
        8
    }

    pub fn write_i64(&mut self, value: i64) -> usize {
        self.ensure_space(8);
        self.buf.put_i64_le(value);
        8
    }

    pub fn write_f64(&mut self, value: f64) -> usize {
        self.ensure_space(8);
        self.buf.put_f64_le(value);
        8
    }

    /// Record a port for the descriptor section. Writes nothing to the buffer.
    pub fn collect_port(&mut self, port: Port) {
        self.ports.push(port);
    }

    /// Encode a tagged value. Returns the number of content bytes written.
    pub fn encode_value(&mut self, value: &Value) -> Result<usize, EncodeError> {
        self.encode_value_at(value, 0)
    }

    /// Encode an array body (size, count, elements), without a type tag.
    pub fn encode_array(&mut self, array: &[Value]) -> Result<usize, EncodeError> {
        self.encode_array_at(array, 0)
    }

    /// Encode a dictionary body (size, count, entries), without a type tag.
    pub fn encode_dict(&mut self, dict: &Dictionary) -> Result<usize, EncodeError> {
        self.encode_dict_at(dict, 0)
    }

    /// Hand over the content bytes and the collected ports.
    pub fn finish(self) -> (BytesMut, Vec<Port>) {
        (self.buf, self.ports)
    }

    fn encode_value_at(&mut self, value: &Value, depth: usize) -> Result<usize, EncodeError> {
        let mut written = self.write_u32(value.value_type().tag());
        match value {
            Value::Null => {}
            Value::Bool(b) => written += self.write_u32(u32::from(*b)),
            Value::UInt64(n) => written += self.write_u64(*n),
            Value::Int64(n) => written += self.write_i64(*n),
            Value::Double(n) => written += self.write_f64(*n),
            Value::String(s) => {
                written += self.write_u32(wire_len("string", s.len() + 1)?);
                written += self.write_string(s)?;
            }
            Value::Array(array) => written += self.encode_array_at(array, depth)?,
            Value::Dict(dict) => written += self.encode_dict_at(dict, depth)?,
            Value::FileHandle(port) | Value::SendHandle(port) | Value::RecvHandle(port) => {
                self.collect_port(*port);
            }
            Value::Uuid(uuid) => written += self.write_raw(uuid.as_bytes()),
            Value::Data(data) => {
                written += self.write_u32(wire_len("data", data.len())?);
                written += self.write_padded(data);
            }
        }
        Ok(written)
    }

    fn encode_array_at(&mut self, array: &[Value], depth: usize) -> Result<usize, EncodeError> {
        self.check_depth(depth)?;
        let size_offset = self.begin_sized();
        self.write_u32(wire_len("array", array.len())?);
        for value in array {
            self.encode_value_at(value, depth + 1)?;
        }
        self.end_sized(size_offset, "array")
    }

    fn encode_dict_at(&mut self, dict: &Dictionary, depth: usize) -> Result<usize, EncodeError> {
        self.check_depth(depth)?;
        let size_offset = self.begin_sized();
        self.write_u32(wire_len("dictionary", dict.len())?);
        for (key, value) in dict {
            self.write_string(key)?;
            self.encode_value_at(value, depth + 1)?;
        }
        self.end_sized(size_offset, "dictionary")
    }

    fn check_depth(&self, depth: usize) -> Result<(), EncodeError> {
        if depth >= self.max_depth {
            return Err(EncodeError::DepthExceeded(self.max_depth));
        }
        Ok(())
    }

    fn begin_sized(&mut self) -> usize {
        let offset = self.buf.len();
        self.write_u32(0);
        offset
    }

    // Backpatch the size placeholder with the bytes that follow it.
    fn end_sized(&mut self, offset: usize, what: &'static str) -> Result<usize, EncodeError> {
        let body = self.buf.len() - offset - 4;
        let size = wire_len(what, body)?;
        self.buf[offset..offset + 4].copy_from_slice(&size.to_le_bytes());
        Ok(body + 4)
    }
}

fn wire_len(what: &'static str, size: usize) -> Result<u32, EncodeError> {
    u32::try_from(size).map_err(|_| EncodeError::TooLarge { what, size })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use uuid::Uuid;

    use super::*;
    use crate::value::{PortDisposition, ValueType};

    fn u32_at(buf: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn padding_is_zero_filled() {
        for len in 0..12usize {
            let mut writer = Writer::new();
            let payload = vec![0xAA; len];
            let written = writer.write_padded(&payload);

            assert_eq!(written % 4, 0);
            assert!(written >= len && written < len + 4);
            assert!(writer.as_bytes()[len..].iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn string_includes_terminator_and_padding() {
        let mut writer = Writer::new();
        assert_eq!(writer.write_string("abc").unwrap(), 4);
        assert_eq!(writer.as_bytes(), b"abc\0");

        let mut writer = Writer::new();
        assert_eq!(writer.write_string("abcd").unwrap(), 8);
        assert_eq!(writer.as_bytes(), b"abcd\0\0\0\0");
    }

    #[test]
    fn string_with_interior_nul_is_rejected() {
        let mut writer = Writer::new();
        let err = writer.write_string("a\0b").unwrap_err();
        assert!(matches!(err, EncodeError::InteriorNul { position: 1 }));
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut writer = Writer::with_capacity(2);
        writer.write_u32(0x0102_0304);
        writer.write_u64(u64::MAX);
        writer.write_raw(&[9; 100]);

        assert_eq!(writer.len(), 112);
        assert_eq!(u32_at(writer.as_bytes(), 0), 0x0102_0304);
        assert_eq!(&writer.as_bytes()[4..12], &[0xFF; 8]);
    }

    #[test]
    fn scalar_layouts() {
        let mut writer = Writer::new();
        assert_eq!(writer.encode_value(&Value::Null).unwrap(), 4);
        assert_eq!(writer.encode_value(&Value::Bool(true)).unwrap(), 8);
        assert_eq!(writer.encode_value(&Value::Int64(-1)).unwrap(), 12);
        assert_eq!(writer.encode_value(&Value::Double(1.5)).unwrap(), 12);

        let buf = writer.as_bytes();
        assert_eq!(u32_at(buf, 0), ValueType::Null.tag());
        assert_eq!(u32_at(buf, 4), ValueType::Bool.tag());
        assert_eq!(u32_at(buf, 8), 1);
        assert_eq!(u32_at(buf, 12), ValueType::Int64.tag());
        assert_eq!(&buf[16..24], &[0xFF; 8]);
        assert_eq!(&buf[28..36], &1.5f64.to_le_bytes());
    }

    #[test]
    fn string_value_carries_length_field() {
        let mut writer = Writer::new();
        let written = writer.encode_value(&Value::from("hey")).unwrap();
        let buf = writer.as_bytes();

        assert_eq!(written, 12);
        assert_eq!(u32_at(buf, 0), ValueType::String.tag());
        assert_eq!(u32_at(buf, 4), 4);
        assert_eq!(&buf[8..12], b"hey\0");
    }

    #[test]
    fn data_and_uuid_layouts() {
        let uuid = Uuid::from_bytes([7; 16]);
        let mut writer = Writer::new();
        writer
            .encode_value(&Value::Data(Bytes::from_static(b"12345")))
            .unwrap();
        writer.encode_value(&Value::Uuid(uuid)).unwrap();
        let buf = writer.as_bytes();

        assert_eq!(u32_at(buf, 4), 5);
        assert_eq!(&buf[8..16], b"12345\0\0\0");
        assert_eq!(u32_at(buf, 16), ValueType::Uuid.tag());
        assert_eq!(&buf[20..36], &[7; 16]);
        assert_eq!(buf.len(), 36);
    }

    #[test]
    fn array_size_is_backpatched() {
        let mut writer = Writer::new();
        let array = vec![Value::UInt64(1), Value::Bool(false)];
        let written = writer.encode_array(&array).unwrap();
        let buf = writer.as_bytes();

        // count (4) + u64 (4 + 8) + bool (4 + 4)
        assert_eq!(u32_at(buf, 0), 24);
        assert_eq!(u32_at(buf, 4), 2);
        assert_eq!(written, 28);
        assert_eq!(buf.len(), 28);
    }

    #[test]
    fn dict_size_is_backpatched() {
        let mut dict = Dictionary::new();
        dict.insert("k", Value::Null);
        let mut writer = Writer::new();
        let written = writer.encode_dict(&dict).unwrap();
        let buf = writer.as_bytes();

        // count (4) + "k\0" padded (4) + null tag (4)
        assert_eq!(u32_at(buf, 0), 12);
        assert_eq!(u32_at(buf, 4), 1);
        assert_eq!(&buf[8..12], b"k\0\0\0");
        assert_eq!(u32_at(buf, 12), ValueType::Null.tag());
        assert_eq!(written, 16);
    }

    #[test]
    fn handles_write_tag_only_and_collect_in_order() {
        let first = Port::new(7, PortDisposition::MoveSend);
        let second = Port::new(9, PortDisposition::MoveReceive);
        let third = Port::new(11, PortDisposition::CopySend);
        let array = vec![
            Value::SendHandle(first),
            Value::Array(vec![Value::RecvHandle(second)]),
            Value::FileHandle(third),
        ];

        let mut writer = Writer::new();
        writer.encode_value(&Value::Array(array)).unwrap();
        let (buf, ports) = writer.finish();

        assert_eq!(ports, vec![first, second, third]);
        // tag + size + count + send tag + (tag + size + count + recv tag) + fd tag
        assert_eq!(buf.len(), 4 + 4 + 4 + 4 + 16 + 4);
    }

    #[test]
    fn depth_limit_applies() {
        let config = CodecConfig {
            max_depth: 2,
            ..CodecConfig::default()
        };
        let nested = Value::Array(vec![Value::Array(vec![Value::Array(vec![])])]);

        let mut writer = Writer::with_config(16, &config);
        let err = writer.encode_value(&nested).unwrap_err();
        assert!(matches!(err, EncodeError::DepthExceeded(2)));

        let mut writer = Writer::with_config(16, &config);
        let shallow = Value::Array(vec![Value::Array(vec![])]);
        assert!(writer.encode_value(&shallow).is_ok());
    }
}
