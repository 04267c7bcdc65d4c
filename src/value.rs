//! Cell values and tree values.
//!
//! A [`Datum`] is what a table cell holds. A [`Value`] is the nested,
//! application-facing tree built by hydration and consumed by dehydration.

use crate::error::{MapperError, MapperResult};
use crate::schema::SchemaNode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

/// The value stored in a single table cell.
///
/// Datums are hashable and ordered so they can serve as join keys and as
/// mapping keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Datum {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Datum {
    /// Reads a datum back from its textual key form.
    ///
    /// Integers in canonical form and booleans are recognized; anything else
    /// is text, so `"007"` and `"+7"` stay text.
    pub fn parse_key(text: &str) -> Self {
        if let Ok(n) = text.parse::<i64>() {
            if n.to_string() == text {
                return Datum::Int(n);
            }
        }
        match text {
            "true" => Datum::Bool(true),
            "false" => Datum::Bool(false),
            _ => Datum::Text(text.to_string()),
        }
    }

    /// Renders the datum the way it appears as a JSON object key.
    pub fn key_text(&self) -> String {
        match self {
            Datum::Bool(b) => b.to_string(),
            Datum::Int(n) => n.to_string(),
            Datum::Text(s) => s.clone(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Datum::Bool(b) => JsonValue::Bool(*b),
            Datum::Int(n) => JsonValue::from(*n),
            Datum::Text(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Bool(b) => write!(f, "{}", b),
            Datum::Int(n) => write!(f, "{}", n),
            Datum::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for Datum {
    fn from(n: i64) -> Self {
        Datum::Int(n)
    }
}

impl From<i32> for Datum {
    fn from(n: i32) -> Self {
        Datum::Int(i64::from(n))
    }
}

impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Datum::Bool(b)
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::Text(s.to_string())
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::Text(s)
    }
}

/// A nested tree value.
///
/// `Absent` stands for a single-valued relationship that matched no row.
/// `Mapping` keeps its entries in insertion order, which dehydration uses
/// as table-row order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Absent,
    Scalar(Datum),
    Record(BTreeMap<String, Value>),
    Sequence(Vec<Value>),
    Mapping(Vec<(Value, Value)>),
}

impl Value {
    /// Builds a record value from `(member, value)` pairs.
    pub fn record<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Value::Record(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Short name of the value's shape, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Scalar(_) => "scalar",
            Value::Record(_) => "record",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    /// Converts the tree into JSON.
    ///
    /// Mappings become objects. A scalar key uses its textual form; any other
    /// key is rendered as its JSON text.
    ///
    /// The rendering is lossy for mappings whose keys differ only in datum
    /// type: `Int(1)` and `Text("1")` both become `"1"` and the later entry
    /// wins. Text keys that look like canonical integers or booleans read
    /// back through [`Value::from_json`] as `Int`/`Bool`. Use the
    /// `[key, value]` pair form on input when keys must keep their type.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Absent => JsonValue::Null,
            Value::Scalar(d) => d.to_json(),
            Value::Record(members) => JsonValue::Object(
                members
                    .iter()
                    .map(|(name, v)| (name.clone(), v.to_json()))
                    .collect::<Map<String, JsonValue>>(),
            ),
            Value::Sequence(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Mapping(entries) => {
                let mut object = Map::new();
                for (key, v) in entries {
                    let key_text = match key {
                        Value::Scalar(d) => d.key_text(),
                        other => other.to_json().to_string(),
                    };
                    object.insert(key_text, v.to_json());
                }
                JsonValue::Object(object)
            }
        }
    }

    /// Reads a tree from JSON, guided by the schema it must conform to.
    ///
    /// `null` reads as `Absent` everywhere. A mapping is accepted either as
    /// an object (keys parsed per the key schema) or as an array of
    /// `[key, value]` pairs, which preserves entry order.
    pub fn from_json(json: &JsonValue, schema: &SchemaNode) -> MapperResult<Value> {
        if json.is_null() {
            return Ok(Value::Absent);
        }
        match schema {
            SchemaNode::Scalar { .. } => match json {
                JsonValue::Bool(b) => Ok(Value::Scalar(Datum::Bool(*b))),
                JsonValue::Number(n) => n
                    .as_i64()
                    .map(|n| Value::Scalar(Datum::Int(n)))
                    .ok_or_else(|| MapperError::shape_mismatch("integer", n.to_string())),
                JsonValue::String(s) => Ok(Value::Scalar(Datum::Text(s.clone()))),
                other => Err(MapperError::shape_mismatch("scalar", json_kind(other))),
            },
            SchemaNode::Record { members, .. } => {
                let object = json
                    .as_object()
                    .ok_or_else(|| MapperError::shape_mismatch("record", json_kind(json)))?;
                if let Some(extra) = object
                    .keys()
                    .find(|k| !members.iter().any(|(name, _)| name == *k))
                {
                    return Err(MapperError::UnknownMember {
                        member: extra.clone(),
                    });
                }
                let mut record = BTreeMap::new();
                for (name, member) in members {
                    let value = match object.get(name) {
                        Some(child) => Value::from_json(child, member)?,
                        None => Value::Absent,
                    };
                    record.insert(name.clone(), value);
                }
                Ok(Value::Record(record))
            }
            SchemaNode::Sequence { element, .. } => {
                let items = json
                    .as_array()
                    .ok_or_else(|| MapperError::shape_mismatch("sequence", json_kind(json)))?;
                let values = items
                    .iter()
                    .map(|item| Value::from_json(item, element))
                    .collect::<MapperResult<Vec<_>>>()?;
                Ok(Value::Sequence(values))
            }
            SchemaNode::Mapping { key, value, .. } => match json {
                JsonValue::Object(object) => {
                    let mut entries = Vec::with_capacity(object.len());
                    for (key_text, v) in object {
                        let k = read_key(key_text, key)?;
                        entries.push((k, Value::from_json(v, value)?));
                    }
                    Ok(Value::Mapping(entries))
                }
                JsonValue::Array(pairs) => {
                    let mut entries = Vec::with_capacity(pairs.len());
                    for pair in pairs {
                        match pair.as_array().map(Vec::as_slice) {
                            Some([k, v]) => {
                                entries.push((Value::from_json(k, key)?, Value::from_json(v, value)?))
                            }
                            _ => return Err(MapperError::shape_mismatch("[key, value] pair", json_kind(pair))),
                        }
                    }
                    Ok(Value::Mapping(entries))
                }
                other => Err(MapperError::shape_mismatch("mapping", json_kind(other))),
            },
        }
    }
}

fn read_key(key_text: &str, key_schema: &SchemaNode) -> MapperResult<Value> {
    match key_schema {
        SchemaNode::Scalar { .. } => Ok(Value::Scalar(Datum::parse_key(key_text))),
        _ => {
            let parsed: JsonValue = serde_json::from_str(key_text)
                .map_err(|e| MapperError::shape_mismatch("JSON-encoded mapping key", e.to_string()))?;
            Value::from_json(&parsed, key_schema)
        }
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

impl From<Datum> for Value {
    fn from(d: Datum) -> Self {
        Value::Scalar(d)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Scalar(Datum::Int(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Scalar(Datum::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Datum::from(s))
    }
}
