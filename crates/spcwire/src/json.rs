//! JSON view of value trees.
//!
//! Plain JSON maps onto the natural value kinds: non-negative integers become
//! `uint64`, negative integers `int64`, other numbers `double`, objects
//! dictionaries. Everything else uses a single-key tagged object:
//!
//! ```text
//! {"$int64": -1}  {"$uint64": 1}  {"$double": 1.5}  {"$data": [0, 255]}
//! {"$uuid": "6ba7b810-9dad-11d1-80b4-00c04fd430c8"}
//! {"$send_port": {"name": 7, "disposition": "move-send"}}   ($fd, $recv_port)
//! ```

use serde_json::{json, Map, Number};
use spcwire_codec::{Bytes, Dictionary, Port, PortDisposition, Uuid, Value};

use crate::exit::{CliError, CliResult};

/// Convert a JSON object into a content dictionary.
pub fn to_dictionary(json: &serde_json::Value) -> CliResult<Dictionary> {
    match to_value(json)? {
        Value::Dict(dict) => Ok(dict),
        other => Err(CliError::data_invalid(format!(
            "message content must be a JSON object, got {}",
            other.value_type()
        ))),
    }
}

pub fn to_value(json: &serde_json::Value) -> CliResult<Value> {
    let value = match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => number_to_value(n),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            Value::Array(items.iter().map(to_value).collect::<CliResult<_>>()?)
        }
        serde_json::Value::Object(map) => match tagged_entry(map) {
            Some((tag, inner)) => tagged_to_value(tag, inner)?,
            None => {
                let mut dict = Dictionary::with_capacity(map.len());
                for (key, value) in map {
                    dict.insert(key.as_str(), to_value(value)?);
                }
                Value::Dict(dict)
            }
        },
    };
    Ok(value)
}

pub fn from_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::UInt64(n) => json!(n),
        Value::Int64(n) => json!({ "$int64": n }),
        Value::Double(n) => match Number::from_f64(*n) {
            Some(number) => serde_json::Value::Number(number),
            None => json!({ "$double": n.to_string() }),
        },
        Value::String(s) => json!(s),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(from_value).collect()),
        Value::Dict(dict) => serde_json::Value::Object(
            dict.iter()
                .map(|(key, value)| (key.clone(), from_value(value)))
                .collect(),
        ),
        Value::Data(data) => json!({ "$data": data.as_ref() }),
        Value::Uuid(uuid) => json!({ "$uuid": uuid.hyphenated().to_string() }),
        Value::FileHandle(port) => json!({ "$fd": port_to_json(port) }),
        Value::SendHandle(port) => json!({ "$send_port": port_to_json(port) }),
        Value::RecvHandle(port) => json!({ "$recv_port": port_to_json(port) }),
    }
}

pub fn port_to_json(port: &Port) -> serde_json::Value {
    json!({ "name": port.name, "disposition": port.disposition.name() })
}

fn number_to_value(n: &Number) -> Value {
    if let Some(u) = n.as_u64() {
        Value::UInt64(u)
    } else if let Some(i) = n.as_i64() {
        Value::Int64(i)
    } else {
        Value::Double(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn tagged_entry(map: &Map<String, serde_json::Value>) -> Option<(&str, &serde_json::Value)> {
    if map.len() != 1 {
        return None;
    }
    map.iter()
        .next()
        .filter(|(key, _)| key.starts_with('$'))
        .map(|(key, value)| (key.as_str(), value))
}

fn tagged_to_value(tag: &str, inner: &serde_json::Value) -> CliResult<Value> {
    let invalid = |expected: &str| CliError::data_invalid(format!("{tag} expects {expected}, got {inner}"));

    let value = match tag {
        "$int64" => Value::Int64(inner.as_i64().ok_or_else(|| invalid("a signed integer"))?),
        "$uint64" => Value::UInt64(inner.as_u64().ok_or_else(|| invalid("an unsigned integer"))?),
        "$double" => {
            let n = match inner {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            };
            Value::Double(n.ok_or_else(|| invalid("a number"))?)
        }
        "$data" => {
            let items = inner.as_array().ok_or_else(|| invalid("an array of bytes"))?;
            let bytes = items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| invalid("an array of bytes"))
                })
                .collect::<CliResult<Vec<u8>>>()?;
            Value::Data(Bytes::from(bytes))
        }
        "$uuid" => {
            let text = inner.as_str().ok_or_else(|| invalid("a UUID string"))?;
            Value::Uuid(Uuid::parse_str(text).map_err(|_| invalid("a UUID string"))?)
        }
        "$fd" => Value::FileHandle(json_to_port(tag, inner)?),
        "$send_port" => Value::SendHandle(json_to_port(tag, inner)?),
        "$recv_port" => Value::RecvHandle(json_to_port(tag, inner)?),
        other => {
            return Err(CliError::data_invalid(format!(
                "unknown tagged value {other}"
            )))
        }
    };
    Ok(value)
}

fn json_to_port(tag: &str, inner: &serde_json::Value) -> CliResult<Port> {
    let name = inner
        .get("name")
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| CliError::data_invalid(format!("{tag} requires a 32-bit \"name\"")))?;
    let disposition = match inner.get("disposition").and_then(serde_json::Value::as_str) {
        Some(text) => text
            .parse::<PortDisposition>()
            .map_err(|err| CliError::data_invalid(format!("{tag}: {err}")))?,
        None => PortDisposition::CopySend,
    };
    Ok(Port::new(name, disposition))
}
