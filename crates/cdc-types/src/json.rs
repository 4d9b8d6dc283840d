//! Decimal coercion for schemaless JSON.
//!
//! Message keys in Debezium stacks are often plain JSON. A
//! `VariableScaleDecimal` then shows up with its magnitude base64-encoded:
//!
//! ```json
//! {"ACCOUNT_NO": {"scale": 0, "value": "AQ=="}}
//! ```
//!
//! [`coerce_json_decimals`] applies the same rule as the Avro normalizer
//! after decoding the base64. Objects that only look similar are left alone.

use crate::logical::{LogicalShape, ScaledDecimal};
use base64::Engine;
use serde_json::{Map, Value};

/// Recursively replace `{scale, value}` objects with decimal strings.
pub fn coerce_json_decimals(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(text) = json_scaled_decimal(&map).and_then(|shape| shape.render()) {
                return Value::String(text);
            }
            Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, coerce_json_decimals(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(coerce_json_decimals).collect()),
        other => other,
    }
}

fn json_scaled_decimal(map: &Map<String, Value>) -> Option<LogicalShape> {
    if map.len() != 2 {
        return None;
    }
    let scale = i32::try_from(map.get("scale")?.as_i64()?).ok()?;
    let encoded = map.get("value")?.as_str()?;
    let unscaled = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    Some(LogicalShape::ScaledDecimal(ScaledDecimal::new(
        scale, unscaled,
    )))
}
