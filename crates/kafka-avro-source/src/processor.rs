//! Per-message processing: raw message in, output envelope out.
//!
//! Nothing in here fails. Keys degrade to less structured forms, values
//! that cannot be decoded are carried as base64 next to a failure marker.

use crate::avro::frame::FrameDecoder;
use cdc_types::{
    coerce_json_decimals, DecodedValue, KeyRepr, LogicalTypeNormalizer, OutputEnvelope,
    RawMessage,
};
use clap::ValueEnum;
use schema_registry::{SchemaCoordinate, SchemaResolver};
use std::sync::Arc;
use tracing::{debug, warn};

/// Which part of a decoded Debezium envelope to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ValueSelector {
    /// The `after` row image
    #[default]
    After,
    /// The `before` row image
    Before,
    /// The whole decoded record
    Envelope,
}

impl ValueSelector {
    fn field_name(self) -> Option<&'static str> {
        match self {
            ValueSelector::After => Some("after"),
            ValueSelector::Before => Some("before"),
            ValueSelector::Envelope => None,
        }
    }
}

pub struct MessageProcessor {
    resolver: Arc<SchemaResolver>,
    group: String,
    artifact_id: Option<String>,
    frame: FrameDecoder,
    normalizer: LogicalTypeNormalizer,
    selector: ValueSelector,
}

impl MessageProcessor {
    pub fn new(resolver: Arc<SchemaResolver>, group: impl Into<String>) -> Self {
        Self {
            resolver,
            group: group.into(),
            artifact_id: None,
            frame: FrameDecoder::default(),
            normalizer: LogicalTypeNormalizer::default(),
            selector: ValueSelector::default(),
        }
    }

    /// Use one artifact for every topic instead of `<topic>-value`.
    pub fn with_artifact_id(mut self, artifact_id: Option<String>) -> Self {
        self.artifact_id = artifact_id;
        self
    }

    pub fn with_frame_decoder(mut self, frame: FrameDecoder) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_normalizer(mut self, normalizer: LogicalTypeNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_selector(mut self, selector: ValueSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn frame_decoder(&self) -> &FrameDecoder {
        &self.frame
    }

    /// Registry coordinate of the value schema for `topic`.
    pub fn coordinate_for(&self, topic: &str) -> SchemaCoordinate {
        match &self.artifact_id {
            Some(id) => SchemaCoordinate::new(self.group.clone(), id.clone()),
            None => SchemaCoordinate::topic_value(self.group.clone(), topic),
        }
    }

    pub async fn process(&self, message: &RawMessage) -> OutputEnvelope {
        let mut envelope = OutputEnvelope::for_message(message);
        envelope.key = message.key.as_deref().map(decode_key);

        let Some(raw) = message.value.as_deref() else {
            return envelope;
        };

        let coordinate = self.coordinate_for(&message.topic);
        let document = match self.resolver.resolve(&coordinate).await {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    "No schema for {}[{}]@{}: {e}",
                    message.topic, message.partition, message.offset
                );
                return envelope.with_decode_failure(e.to_string(), raw);
            }
        };

        match self.frame.decode(raw, document.schema()) {
            Ok(framed) => {
                debug!(
                    "Decoded {}[{}]@{} with header length {}",
                    message.topic, message.partition, message.offset, framed.header_len
                );
                envelope.value = Some(self.surface(&framed.value));
                envelope
            }
            Err(e) => {
                warn!(
                    "Undecodable value at {}[{}]@{}: {e}",
                    message.topic, message.partition, message.offset
                );
                envelope.with_decode_failure(e.to_string(), raw)
            }
        }
    }

    /// Pick the selected part of the decoded record and normalize it.
    fn surface(&self, decoded: &DecodedValue) -> DecodedValue {
        let selected = self
            .selector
            .field_name()
            .and_then(|name| decoded.field(name))
            .unwrap_or(decoded);
        self.normalizer.normalize(selected, None)
    }
}

/// Best-effort key decoding: JSON, then text, then tagged bytes.
pub fn decode_key(bytes: &[u8]) -> KeyRepr {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!("Key is not UTF-8 ({e}), keeping raw bytes");
            return KeyRepr::Bytes(bytes.to_vec());
        }
    };
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => KeyRepr::Json(coerce_json_decimals(json)),
        Err(e) => {
            debug!("Key is not JSON ({e}), keeping text");
            KeyRepr::Text(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apache_avro::types::Value;
    use apache_avro::Schema;
    use schema_registry::InMemoryRegistry;
    use serde_json::json;

    const ENVELOPE_SCHEMA: &str = r#"{
        "type": "record",
        "name": "Envelope",
        "fields": [
            {"name": "before", "type": ["null", {
                "type": "record",
                "name": "Row",
                "fields": [
                    {"name": "ID", "type": "string"},
                    {"name": "BALANCE", "type": {
                        "type": "record",
                        "name": "VariableScaleDecimal",
                        "fields": [
                            {"name": "scale", "type": "int"},
                            {"name": "value", "type": "bytes"}
                        ]
                    }},
                    {"name": "LAST_MOD_DTTM", "type": "long"}
                ]
            }], "default": null},
            {"name": "after", "type": ["null", "Row"], "default": null},
            {"name": "op", "type": "string"}
        ]
    }"#;

    fn row(balance: i64) -> Value {
        Value::Record(vec![
            ("ID".to_string(), Value::String("7".to_string())),
            (
                "BALANCE".to_string(),
                Value::Record(vec![
                    ("scale".to_string(), Value::Int(2)),
                    ("value".to_string(), Value::Bytes(balance.to_be_bytes().to_vec())),
                ]),
            ),
            ("LAST_MOD_DTTM".to_string(), Value::Long(1_700_000_000_000_000)),
        ])
    }

    fn payload() -> Vec<u8> {
        let schema = Schema::parse_str(ENVELOPE_SCHEMA).unwrap();
        let record = Value::Record(vec![
            ("before".to_string(), Value::Union(0, Box::new(Value::Null))),
            ("after".to_string(), Value::Union(1, Box::new(row(12345)))),
            ("op".to_string(), Value::String("c".to_string())),
        ]);
        let mut framed = vec![0x00, 0x00, 0x00, 0x00, 0x01];
        framed.extend(apache_avro::to_avro_datum(&schema, record).unwrap());
        framed
    }

    fn processor(selector: ValueSelector) -> MessageProcessor {
        let registry = InMemoryRegistry::new().with_artifact(
            "oracle-esw",
            "raw-ACCOUNTS-value",
            ENVELOPE_SCHEMA,
        );
        let resolver = Arc::new(SchemaResolver::new(Arc::new(registry)));
        MessageProcessor::new(resolver, "oracle-esw").with_selector(selector)
    }

    fn message(key: Option<&[u8]>, value: Option<Vec<u8>>) -> RawMessage {
        RawMessage {
            topic: "raw-ACCOUNTS".to_string(),
            partition: 0,
            offset: 3,
            timestamp: Some(1_700_000_000_123),
            key: key.map(|k| k.to_vec()),
            value,
        }
    }

    fn to_json(envelope: &OutputEnvelope) -> serde_json::Value {
        serde_json::from_str(&envelope.to_json_line().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_after_image_is_normalized() {
        let envelope = processor(ValueSelector::After)
            .process(&message(None, Some(payload())))
            .await;
        assert_eq!(
            to_json(&envelope)["value"],
            json!({
                "ID": "7",
                "BALANCE": "123.45",
                "LAST_MOD_DTTM": "2023-11-14T22:13:20.000000+00:00"
            })
        );
    }

    #[tokio::test]
    async fn test_before_null_stays_null() {
        let envelope = processor(ValueSelector::Before)
            .process(&message(None, Some(payload())))
            .await;
        assert!(!envelope.is_decode_failure());
        assert_eq!(envelope.value, Some(DecodedValue::Null));
    }

    #[tokio::test]
    async fn test_envelope_selector_normalizes_nested_rows() {
        let envelope = processor(ValueSelector::Envelope)
            .process(&message(None, Some(payload())))
            .await;
        let json = to_json(&envelope);
        assert_eq!(json["value"]["op"], "c");
        assert_eq!(json["value"]["before"], serde_json::Value::Null);
        assert_eq!(json["value"]["after"]["BALANCE"], "123.45");
    }

    #[tokio::test]
    async fn test_undecodable_value_keeps_raw_bytes() {
        let raw = vec![0xff; 3];
        let envelope = processor(ValueSelector::After)
            .process(&message(None, Some(raw)))
            .await;
        let json = to_json(&envelope);
        assert_eq!(json["value"], serde_json::Value::Null);
        assert_eq!(json["value_raw_b64"], "////");
        assert!(json["value_decode_error"].is_string());
    }

    #[tokio::test]
    async fn test_missing_schema_is_a_decode_failure() {
        let mut msg = message(None, Some(payload()));
        msg.topic = "raw-UNKNOWN".to_string();
        let envelope = processor(ValueSelector::After).process(&msg).await;
        assert!(envelope.is_decode_failure());
        assert!(envelope
            .value_decode_error
            .as_deref()
            .unwrap()
            .contains("oracle-esw/raw-UNKNOWN-value"));
    }

    #[tokio::test]
    async fn test_tombstone_has_no_value() {
        let envelope = processor(ValueSelector::After)
            .process(&message(Some(b"{\"ID\":\"7\"}"), None))
            .await;
        assert!(!envelope.is_decode_failure());
        assert_eq!(envelope.value, None);
        assert_eq!(envelope.key, Some(KeyRepr::Json(json!({"ID": "7"}))));
    }

    #[test]
    fn test_key_fallbacks() {
        assert_eq!(
            decode_key(br#"{"ID":{"scale":0,"value":"AQ=="}}"#),
            KeyRepr::Json(json!({"ID": "1"}))
        );
        assert_eq!(decode_key(b"plain-key"), KeyRepr::Text("plain-key".to_string()));
        assert_eq!(decode_key(&[0xc3, 0x28]), KeyRepr::Bytes(vec![0xc3, 0x28]));
    }

    #[test]
    fn test_artifact_override() {
        let resolver = Arc::new(SchemaResolver::new(Arc::new(InMemoryRegistry::new())));
        let processor = MessageProcessor::new(resolver.clone(), "g");
        assert_eq!(processor.coordinate_for("t").artifact_id, "t-value");

        let processor =
            MessageProcessor::new(resolver, "g").with_artifact_id(Some("shared".to_string()));
        assert_eq!(processor.coordinate_for("t").artifact_id, "shared");
    }
}
