use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::error::DecodeError;

/// Wire type tags. Every encoded value starts with one of these as a `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ValueType {
    Null = 0x1000,
    Bool = 0x2000,
    Int64 = 0x3000,
    UInt64 = 0x4000,
    Double = 0x5000,
    Data = 0x8000,
    String = 0x9000,
    Uuid = 0xa000,
    FileHandle = 0xb000,
    SendHandle = 0xd000,
    Array = 0xe000,
    Dict = 0xf000,
    RecvHandle = 0x15000,
}

impl ValueType {
    /// Map a raw wire tag to a known type.
    pub fn from_tag(tag: u32) -> Option<Self> {
        let ty = match tag {
            0x1000 => Self::Null,
            0x2000 => Self::Bool,
            0x3000 => Self::Int64,
            0x4000 => Self::UInt64,
            0x5000 => Self::Double,
            0x8000 => Self::Data,
            0x9000 => Self::String,
            0xa000 => Self::Uuid,
            0xb000 => Self::FileHandle,
            0xd000 => Self::SendHandle,
            0xe000 => Self::Array,
            0xf000 => Self::Dict,
            0x15000 => Self::RecvHandle,
            _ => return None,
        };
        Some(ty)
    }

    /// The raw wire tag.
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Whether values of this type travel through the descriptor section.
    pub fn is_handle(self) -> bool {
        matches!(
            self,
            Self::FileHandle | Self::SendHandle | Self::RecvHandle
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Double => "double",
            Self::Data => "data",
            Self::String => "string",
            Self::Uuid => "uuid",
            Self::FileHandle => "fd",
            Self::SendHandle => "send_port",
            Self::Array => "array",
            Self::Dict => "dictionary",
            Self::RecvHandle => "recv_port",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mach right-transfer mode attached to a port name.
///
/// Values match the kernel's `MACH_MSG_TYPE_*` constants. Received messages
/// report `PORT_RECEIVE`/`PORT_SEND`/`PORT_SEND_ONCE`, which share the numeric
/// values of the `Move*` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PortDisposition {
    #[default]
    None = 0,
    MoveReceive = 16,
    MoveSend = 17,
    MoveSendOnce = 18,
    CopySend = 19,
    MakeSend = 20,
    MakeSendOnce = 21,
    CopyReceive = 22,
    DisposeReceive = 24,
    DisposeSend = 25,
    DisposeSendOnce = 26,
}

const DISPOSITION_NAMES: &[(PortDisposition, &str)] = &[
    (PortDisposition::None, "none"),
    (PortDisposition::MoveReceive, "move-receive"),
    (PortDisposition::MoveSend, "move-send"),
    (PortDisposition::MoveSendOnce, "move-send-once"),
    (PortDisposition::CopySend, "copy-send"),
    (PortDisposition::MakeSend, "make-send"),
    (PortDisposition::MakeSendOnce, "make-send-once"),
    (PortDisposition::CopyReceive, "copy-receive"),
    (PortDisposition::DisposeReceive, "dispose-receive"),
    (PortDisposition::DisposeSend, "dispose-send"),
    (PortDisposition::DisposeSendOnce, "dispose-send-once"),
];

impl PortDisposition {
    /// Parse a raw disposition value from a descriptor or header.
    pub fn from_raw(raw: u32) -> Result<Self, DecodeError> {
        DISPOSITION_NAMES
            .iter()
            .map(|(disposition, _)| *disposition)
            .find(|disposition| u32::from(disposition.raw()) == raw)
            .ok_or(DecodeError::UnknownDisposition(raw))
    }

    pub fn raw(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        DISPOSITION_NAMES
            .iter()
            .find(|(disposition, _)| *disposition == self)
            .map(|(_, name)| *name)
            .unwrap_or("none")
    }
}

impl fmt::Display for PortDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a disposition name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown port disposition name {0:?}")]
pub struct ParseDispositionError(String);

impl FromStr for PortDisposition {
    type Err = ParseDispositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DISPOSITION_NAMES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(s))
            .map(|(disposition, _)| *disposition)
            .ok_or_else(|| ParseDispositionError(s.to_string()))
    }
}

/// A kernel port name together with how its right is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Port {
    pub name: u32,
    pub disposition: PortDisposition,
}

impl Port {
    /// Sentinel for an absent handle.
    pub const NULL: Port = Port {
        name: 0,
        disposition: PortDisposition::None,
    };

    pub fn new(name: u32, disposition: PortDisposition) -> Self {
        Self { name, disposition }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

/// Ordered sequence of values.
pub type Array = Vec<Value>;

/// String-keyed dictionary that keeps insertion (and wire) order.
///
/// Equality ignores order: two dictionaries are equal when they hold the same
/// key/value pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: IndexMap<String, Value>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace a value. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.entries.keys()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Dictionary {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Every datum representable on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    UInt64(u64),
    Int64(i64),
    Double(f64),
    String(String),
    Array(Array),
    Dict(Dictionary),
    Data(Bytes),
    Uuid(Uuid),
    FileHandle(Port),
    SendHandle(Port),
    RecvHandle(Port),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::UInt64(_) => ValueType::UInt64,
            Value::Int64(_) => ValueType::Int64,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Dict(_) => ValueType::Dict,
            Value::Data(_) => ValueType::Data,
            Value::Uuid(_) => ValueType::Uuid,
            Value::FileHandle(_) => ValueType::FileHandle,
            Value::SendHandle(_) => ValueType::SendHandle,
            Value::RecvHandle(_) => ValueType::RecvHandle,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&Bytes> {
        match self {
            Value::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Value::Uuid(u) => Some(u),
            _ => None,
        }
    }

    /// The port carried by any of the three handle kinds.
    pub fn as_port(&self) -> Option<Port> {
        match self {
            Value::FileHandle(p) | Value::SendHandle(p) | Value::RecvHandle(p) => Some(*p),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt64(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}

impl From<Dictionary> for Value {
    fn from(value: Dictionary) -> Self {
        Value::Dict(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Data(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_roundtrip_through_from_tag() {
        let all = [
            ValueType::Null,
            ValueType::Bool,
            ValueType::Int64,
            ValueType::UInt64,
            ValueType::Double,
            ValueType::Data,
            ValueType::String,
            ValueType::Uuid,
            ValueType::FileHandle,
            ValueType::SendHandle,
            ValueType::Array,
            ValueType::Dict,
            ValueType::RecvHandle,
        ];
        for ty in all {
            assert_eq!(ValueType::from_tag(ty.tag()), Some(ty));
        }
        assert_eq!(ValueType::from_tag(0x6000), None);
        assert_eq!(ValueType::Dict.tag(), 0xf000);
    }

    #[test]
    fn disposition_raw_values() {
        assert_eq!(PortDisposition::from_raw(17).unwrap(), PortDisposition::MoveSend);
        assert_eq!(PortDisposition::from_raw(0).unwrap(), PortDisposition::None);
        assert!(matches!(
            PortDisposition::from_raw(23),
            Err(DecodeError::UnknownDisposition(23))
        ));
    }

    #[test]
    fn disposition_names_parse() {
        assert_eq!(
            "copy-send".parse::<PortDisposition>().unwrap(),
            PortDisposition::CopySend
        );
        assert_eq!(
            "MOVE-RECEIVE".parse::<PortDisposition>().unwrap(),
            PortDisposition::MoveReceive
        );
        assert!("send".parse::<PortDisposition>().is_err());
        assert_eq!(PortDisposition::MakeSendOnce.to_string(), "make-send-once");
    }

    #[test]
    fn null_port_sentinel() {
        assert!(Port::NULL.is_null());
        assert!(Port::default().is_null());
        assert!(!Port::new(7, PortDisposition::MoveSend).is_null());
    }

    #[test]
    fn dictionary_keeps_insertion_order() {
        let mut dict = Dictionary::new();
        dict.insert("z", 1u64);
        dict.insert("a", 2u64);
        dict.insert("m", 3u64);
        let keys: Vec<_> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);

        dict.insert("z", 9u64);
        let keys: Vec<_> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(dict.get("z").and_then(Value::as_u64), Some(9));

        dict.remove("a");
        let keys: Vec<_> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "m"]);
    }

    #[test]
    fn dictionary_equality_ignores_order() {
        let left: Dictionary = [("a", 1u64), ("b", 2u64)].into_iter().collect();
        let right: Dictionary = [("b", 2u64), ("a", 1u64)].into_iter().collect();
        assert_eq!(left, right);
    }

    #[test]
    fn value_accessors() {
        let port = Port::new(3, PortDisposition::CopySend);
        assert_eq!(Value::SendHandle(port).as_port(), Some(port));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(-4i64).as_i64(), Some(-4));
        assert_eq!(Value::from(true).value_type(), ValueType::Bool);
        assert!(Value::Null.as_port().is_none());
    }
}
