//! Conversion from `apache_avro` values to [`DecodedValue`].
//!
//! Unions collapse to their branch value. Avro logical types are lowered to
//! the primitive they are carried in (dates and times to integers, decimals
//! to their two's-complement bytes) so that all logical-type interpretation
//! happens in one place, the normalizer.

use apache_avro::types::Value;
use cdc_types::DecodedValue;
use tracing::debug;

pub fn avro_to_decoded(value: Value) -> DecodedValue {
    match value {
        Value::Null => DecodedValue::Null,
        Value::Boolean(b) => DecodedValue::Boolean(b),
        Value::Int(i) => DecodedValue::Int(i),
        Value::Long(l) => DecodedValue::Long(l),
        Value::Float(f) => DecodedValue::Float(f),
        Value::Double(d) => DecodedValue::Double(d),
        Value::String(s) => DecodedValue::String(s),
        Value::Bytes(bytes) => DecodedValue::Bytes(bytes),
        Value::Fixed(_, bytes) => DecodedValue::Bytes(bytes),
        Value::Enum(_, symbol) => DecodedValue::String(symbol),
        Value::Union(_, inner) => avro_to_decoded(*inner),
        Value::Array(items) => DecodedValue::Array(items.into_iter().map(avro_to_decoded).collect()),
        Value::Map(entries) => DecodedValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, avro_to_decoded(v)))
                .collect(),
        ),
        Value::Record(fields) => DecodedValue::Record(
            fields
                .into_iter()
                .map(|(name, v)| (name, avro_to_decoded(v)))
                .collect(),
        ),

        Value::Date(days) => DecodedValue::Int(days),
        Value::TimeMillis(ms) => DecodedValue::Int(ms),
        Value::TimeMicros(us) => DecodedValue::Long(us),
        Value::TimestampMillis(ms) | Value::LocalTimestampMillis(ms) => DecodedValue::Long(ms),
        Value::TimestampMicros(us) | Value::LocalTimestampMicros(us) => DecodedValue::Long(us),
        Value::Decimal(decimal) => match Vec::<u8>::try_from(&decimal) {
            Ok(bytes) => DecodedValue::Bytes(bytes),
            Err(e) => {
                debug!("Keeping decimal as text: {e}");
                DecodedValue::String(format!("{decimal:?}"))
            }
        },
        Value::Uuid(uuid) => DecodedValue::String(uuid.to_string()),

        #[allow(unreachable_patterns)]
        other => DecodedValue::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_union_and_enum_collapse() {
        let value = Value::Record(vec![
            (
                "after".to_string(),
                Value::Union(1, Box::new(Value::Record(vec![(
                    "id".to_string(),
                    Value::String("1".to_string()),
                )]))),
            ),
            ("op".to_string(), Value::Enum(0, "c".to_string())),
            ("before".to_string(), Value::Union(0, Box::new(Value::Null))),
        ]);

        let decoded = avro_to_decoded(value);
        assert_eq!(
            decoded,
            DecodedValue::record([
                ("after", DecodedValue::record([("id", DecodedValue::from("1"))])),
                ("op", DecodedValue::from("c")),
                ("before", DecodedValue::Null),
            ])
        );
    }

    #[test]
    fn test_fixed_and_logical_primitives() {
        assert_eq!(
            avro_to_decoded(Value::Fixed(2, vec![1, 2])),
            DecodedValue::Bytes(vec![1, 2])
        );
        assert_eq!(avro_to_decoded(Value::Date(19000)), DecodedValue::Int(19000));
        assert_eq!(
            avro_to_decoded(Value::TimestampMicros(1_700_000_000_000_000)),
            DecodedValue::Long(1_700_000_000_000_000)
        );
    }

    #[test]
    fn test_map_is_sorted() {
        let mut entries = HashMap::new();
        entries.insert("b".to_string(), Value::Int(2));
        entries.insert("a".to_string(), Value::Int(1));
        let DecodedValue::Map(map) = avro_to_decoded(Value::Map(entries)) else {
            panic!("expected a map");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
