//! Decoded value tree.
//!
//! [`DecodedValue`] is the runtime representation of one Avro datum after
//! schemaless decoding. It mirrors the Avro data model minus the schema
//! bookkeeping: unions are already resolved to their branch, enums are
//! strings and fixed values are bytes.
//!
//! ## JSON rendering
//!
//! The `Serialize` impl is what ends up on stdout:
//!
//! - records keep schema field order (they are not sorted)
//! - maps are sorted by key
//! - bytes become `{"__bytes__": "<base64>"}` so the output stays text-safe
//! - non-finite floats become `null` (serde_json's behavior)

use base64::Engine;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

/// Key of the single-entry object wrapping byte values in JSON output.
pub const BYTES_TAG: &str = "__bytes__";

/// A value decoded against an Avro schema.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Record fields in schema order.
    Record(Vec<(String, DecodedValue)>),
    Array(Vec<DecodedValue>),
    Map(BTreeMap<String, DecodedValue>),
}

impl DecodedValue {
    /// Build a record from `(name, value)` pairs, keeping their order.
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, DecodedValue)>,
        K: Into<String>,
    {
        DecodedValue::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Get the human-readable type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            DecodedValue::Null => "null",
            DecodedValue::Boolean(_) => "boolean",
            DecodedValue::Int(_) => "int",
            DecodedValue::Long(_) => "long",
            DecodedValue::Float(_) => "float",
            DecodedValue::Double(_) => "double",
            DecodedValue::String(_) => "string",
            DecodedValue::Bytes(_) => "bytes",
            DecodedValue::Record(_) => "record",
            DecodedValue::Array(_) => "array",
            DecodedValue::Map(_) => "map",
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, DecodedValue::Record(_))
    }

    /// Look up a record field by name. Returns `None` for non-records.
    pub fn field(&self, name: &str) -> Option<&DecodedValue> {
        match self {
            DecodedValue::Record(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Integer payload of `Int` and `Long` values.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            DecodedValue::Int(v) => Some(i64::from(*v)),
            DecodedValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for DecodedValue {
    fn from(s: &str) -> Self {
        DecodedValue::String(s.to_string())
    }
}

impl From<String> for DecodedValue {
    fn from(s: String) -> Self {
        DecodedValue::String(s)
    }
}

impl From<i64> for DecodedValue {
    fn from(v: i64) -> Self {
        DecodedValue::Long(v)
    }
}

impl From<i32> for DecodedValue {
    fn from(v: i32) -> Self {
        DecodedValue::Int(v)
    }
}

impl From<bool> for DecodedValue {
    fn from(v: bool) -> Self {
        DecodedValue::Boolean(v)
    }
}

/// Standard (padded) base64 used for every byte rendering in the output.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Serialize bytes as the tagged base64 wrapper.
pub(crate) fn serialize_bytes<S: Serializer>(
    bytes: &[u8],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(BYTES_TAG, &encode_base64(bytes))?;
    map.end()
}

impl Serialize for DecodedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DecodedValue::Null => serializer.serialize_unit(),
            DecodedValue::Boolean(v) => serializer.serialize_bool(*v),
            DecodedValue::Int(v) => serializer.serialize_i32(*v),
            DecodedValue::Long(v) => serializer.serialize_i64(*v),
            DecodedValue::Float(v) => serializer.serialize_f32(*v),
            DecodedValue::Double(v) => serializer.serialize_f64(*v),
            DecodedValue::String(s) => serializer.serialize_str(s),
            DecodedValue::Bytes(b) => serialize_bytes(b, serializer),
            DecodedValue::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            DecodedValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DecodedValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_in_field_order() {
        let value = DecodedValue::record([
            ("zeta", DecodedValue::Int(1)),
            ("alpha", DecodedValue::from("a")),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":"a"}"#);
    }

    #[test]
    fn test_bytes_serialize_as_tagged_base64() {
        let value = DecodedValue::record([("raw", DecodedValue::Bytes(vec![0x01, 0xff]))]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"raw":{"__bytes__":"Af8="}}"#);
    }

    #[test]
    fn test_non_finite_double_serializes_as_null() {
        let json = serde_json::to_string(&DecodedValue::Double(f64::NAN)).unwrap();
        assert_eq!(json, "null");
    }

    #[test]
    fn test_map_serializes_sorted() {
        let mut entries = BTreeMap::new();
        entries.insert("b".to_string(), DecodedValue::Null);
        entries.insert("a".to_string(), DecodedValue::Boolean(true));
        let json = serde_json::to_string(&DecodedValue::Map(entries)).unwrap();
        assert_eq!(json, r#"{"a":true,"b":null}"#);
    }

    #[test]
    fn test_field_lookup() {
        let value = DecodedValue::record([("after", DecodedValue::Null)]);
        assert_eq!(value.field("after"), Some(&DecodedValue::Null));
        assert_eq!(value.field("before"), None);
        assert_eq!(DecodedValue::Int(1).field("after"), None);
    }

    #[test]
    fn test_as_integer() {
        assert_eq!(DecodedValue::Int(-3).as_integer(), Some(-3));
        assert_eq!(DecodedValue::Long(1 << 40).as_integer(), Some(1 << 40));
        assert_eq!(DecodedValue::Double(1.0).as_integer(), None);
    }
}
