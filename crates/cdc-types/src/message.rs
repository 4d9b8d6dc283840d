//! Kafka message types.
//!
//! [`RawMessage`] is what a message source hands to the processor;
//! [`OutputEnvelope`] is what gets printed, one JSON object per line.

use crate::error::Result;
use crate::value::{encode_base64, serialize_bytes, DecodedValue};
use serde::{Serialize, Serializer};

/// Value of the `client` field in every envelope.
pub const CLIENT_NAME: &str = "rdkafka";

/// A message as received from the source, before any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Kafka topic name
    pub topic: String,
    /// Kafka partition number
    pub partition: i32,
    /// Kafka offset within the partition
    pub offset: i64,
    /// Message timestamp in milliseconds since epoch (if available)
    pub timestamp: Option<i64>,
    /// Message key (if any)
    pub key: Option<Vec<u8>>,
    /// Message value (absent for tombstones)
    pub value: Option<Vec<u8>>,
}

/// Best-effort representation of a message key.
///
/// Keys degrade from structured to raw: JSON if the key is UTF-8 JSON,
/// plain text if it is UTF-8 but not JSON, tagged base64 otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRepr {
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl Serialize for KeyRepr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            KeyRepr::Json(value) => value.serialize(serializer),
            KeyRepr::Text(text) => serializer.serialize_str(text),
            KeyRepr::Bytes(bytes) => serialize_bytes(bytes, serializer),
        }
    }
}

/// One processed message, ready to be written as a JSON line.
///
/// When the value could not be decoded, `value` is `None` and both
/// `value_decode_error` and `value_raw_b64` are set, so the original
/// bytes are always recoverable from the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputEnvelope {
    pub client: &'static str,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: Option<i64>,
    pub key: Option<KeyRepr>,
    pub value: Option<DecodedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_decode_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_raw_b64: Option<String>,
}

impl OutputEnvelope {
    /// Envelope carrying only the source metadata of `message`.
    pub fn for_message(message: &RawMessage) -> Self {
        Self {
            client: CLIENT_NAME,
            topic: message.topic.clone(),
            partition: message.partition,
            offset: message.offset,
            timestamp: message.timestamp,
            key: None,
            value: None,
            value_decode_error: None,
            value_raw_b64: None,
        }
    }

    /// Mark the value as undecodable, keeping a base64 copy of the raw bytes.
    pub fn with_decode_failure(mut self, reason: impl Into<String>, raw: &[u8]) -> Self {
        self.value = None;
        self.value_decode_error = Some(reason.into());
        self.value_raw_b64 = Some(encode_base64(raw));
        self
    }

    pub fn is_decode_failure(&self) -> bool {
        self.value_decode_error.is_some()
    }

    /// Render as a single line of JSON (no trailing newline).
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
