//! Recursive logical-type normalization.
//!
//! [`LogicalTypeNormalizer`] walks a [`DecodedValue`] depth-first and
//! produces a new tree in which recognised logical shapes are replaced by
//! canonical strings:
//!
//! - records shaped `{scale, value}` become exact decimal strings
//! - integers under a timestamp-like field name become ISO-8601 UTC strings
//!
//! Everything else is copied unchanged, so the pass never fails. Records
//! hand each field name down as the hint for its value; arrays and maps
//! pass their own hint through to their elements.

use crate::error::{CdcTypesError, Result};
use crate::logical::LogicalShape;
use crate::value::DecodedValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Field names that hold microsecond timestamps.
///
/// A name matches when it is one of `exact` or ends with one of `suffixes`.
/// Loadable from TOML, where an omitted list is empty:
///
/// ```toml
/// exact = ["FRST_RGSR_DTTM", "LAST_MOD_DTTM"]
/// suffixes = ["_DTTM", "_TS"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampFieldMatcher {
    #[serde(default)]
    pub exact: BTreeSet<String>,
    #[serde(default)]
    pub suffixes: Vec<String>,
}

impl Default for TimestampFieldMatcher {
    fn default() -> Self {
        Self {
            exact: ["FRST_RGSR_DTTM", "LAST_MOD_DTTM"]
                .into_iter()
                .map(String::from)
                .collect(),
            suffixes: vec!["_DTTM".to_string(), "_TS".to_string()],
        }
    }
}

impl TimestampFieldMatcher {
    /// A matcher that never matches.
    pub fn empty() -> Self {
        Self {
            exact: BTreeSet::new(),
            suffixes: Vec::new(),
        }
    }

    pub fn with_exact(mut self, name: impl Into<String>) -> Self {
        self.exact.insert(name.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffixes.push(suffix.into());
        self
    }

    pub fn matches(&self, field_name: &str) -> bool {
        self.exact.contains(field_name)
            || self
                .suffixes
                .iter()
                .any(|suffix| field_name.ends_with(suffix.as_str()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CdcTypesError::TimestampRules(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Rewrites decoded trees into their canonical form.
#[derive(Debug, Clone, Default)]
pub struct LogicalTypeNormalizer {
    timestamps: TimestampFieldMatcher,
}

impl LogicalTypeNormalizer {
    pub fn new(timestamps: TimestampFieldMatcher) -> Self {
        Self { timestamps }
    }

    pub fn timestamps(&self) -> &TimestampFieldMatcher {
        &self.timestamps
    }

    /// Classify a single node, given the name of the field that holds it.
    pub fn classify(&self, value: &DecodedValue, field_hint: Option<&str>) -> Option<LogicalShape> {
        match value {
            DecodedValue::Record(fields) => LogicalShape::from_record_fields(fields),
            DecodedValue::Int(_) | DecodedValue::Long(_) => {
                let name = field_hint?;
                if !self.timestamps.matches(name) {
                    return None;
                }
                value.as_integer().map(LogicalShape::MicroTimestamp)
            }
            _ => None,
        }
    }

    /// Produce a normalized copy of `value`.
    pub fn normalize(&self, value: &DecodedValue, field_hint: Option<&str>) -> DecodedValue {
        if let Some(shape) = self.classify(value, field_hint) {
            // A shape that cannot be rendered (out-of-range timestamp, absurd
            // scale) keeps its original value.
            return match shape.render() {
                Some(text) => DecodedValue::String(text),
                None => {
                    debug!("Leaving {shape:?} under {field_hint:?} unconverted");
                    value.clone()
                }
            };
        }

        match value {
            DecodedValue::Record(fields) => DecodedValue::Record(
                fields
                    .iter()
                    .map(|(name, field)| (name.clone(), self.normalize(field, Some(name.as_str()))))
                    .collect(),
            ),
            DecodedValue::Array(items) => DecodedValue::Array(
                items
                    .iter()
                    .map(|item| self.normalize(item, field_hint))
                    .collect(),
            ),
            DecodedValue::Map(entries) => DecodedValue::Map(
                entries
                    .iter()
                    .map(|(key, item)| (key.clone(), self.normalize(item, field_hint)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn decimal_record(scale: i32, bytes: &[u8]) -> DecodedValue {
        DecodedValue::record([
            ("scale", DecodedValue::Int(scale)),
            ("value", DecodedValue::Bytes(bytes.to_vec())),
        ])
    }

    #[test]
    fn test_default_matcher() {
        let matcher = TimestampFieldMatcher::default();
        assert!(matcher.matches("FRST_RGSR_DTTM"));
        assert!(matcher.matches("LAST_MOD_DTTM"));
        assert!(matcher.matches("CREATED_DTTM"));
        assert!(matcher.matches("UPDATED_TS"));
        assert!(!matcher.matches("updated_at"));
        assert!(!matcher.matches("TS_COUNT"));
    }

    #[test]
    fn test_custom_matcher() {
        let matcher = TimestampFieldMatcher::empty()
            .with_exact("updated_at")
            .with_suffix("_at");
        assert!(matcher.matches("updated_at"));
        assert!(matcher.matches("created_at"));
        assert!(!matcher.matches("LAST_MOD_DTTM"));
    }

    #[test]
    fn test_matcher_from_toml() {
        let matcher = TimestampFieldMatcher::from_toml_str("suffixes = [\"_time\"]").unwrap();
        assert!(matcher.exact.is_empty());
        assert!(matcher.matches("event_time"));

        let err = TimestampFieldMatcher::from_toml_str("suffixes = 3").unwrap_err();
        assert!(err.to_string().contains("Invalid timestamp rules"));
    }

    #[test]
    fn test_matcher_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "exact = [\"OPENED\"]").unwrap();
        let matcher = TimestampFieldMatcher::from_file(file.path()).unwrap();
        assert!(matcher.matches("OPENED"));
        assert!(!matcher.matches("LAST_MOD_DTTM"));
    }

    #[test]
    fn test_decimal_record_replaced() {
        let normalizer = LogicalTypeNormalizer::default();
        let row = DecodedValue::record([
            ("ID", DecodedValue::from("1")),
            ("BALANCE", decimal_record(2, &[0x30, 0x39])),
            ("COUNT", decimal_record(0, &[0x30, 0x39])),
        ]);
        let expected = DecodedValue::record([
            ("ID", DecodedValue::from("1")),
            ("BALANCE", DecodedValue::from("123.45")),
            ("COUNT", DecodedValue::from("12345")),
        ]);
        assert_eq!(normalizer.normalize(&row, None), expected);
    }

    #[test]
    fn test_nested_records_and_arrays() {
        let normalizer = LogicalTypeNormalizer::default();
        let tree = DecodedValue::record([(
            "after",
            DecodedValue::record([(
                "LINES",
                DecodedValue::Array(vec![
                    DecodedValue::record([("AMOUNT", decimal_record(1, &[0x0f]))]),
                    DecodedValue::record([("AMOUNT", decimal_record(1, &[0xf1]))]),
                ]),
            )]),
        )]);
        let expected = DecodedValue::record([(
            "after",
            DecodedValue::record([(
                "LINES",
                DecodedValue::Array(vec![
                    DecodedValue::record([("AMOUNT", DecodedValue::from("1.5"))]),
                    DecodedValue::record([("AMOUNT", DecodedValue::from("-1.5"))]),
                ]),
            )]),
        )]);
        assert_eq!(normalizer.normalize(&tree, None), expected);
    }

    #[test]
    fn test_timestamp_hint() {
        let normalizer = LogicalTypeNormalizer::default();
        let row = DecodedValue::record([
            ("LAST_MOD_DTTM", DecodedValue::Long(1_700_000_000_000_000)),
            ("ROW_COUNT", DecodedValue::Long(1_700_000_000_000_000)),
        ]);
        let normalized = normalizer.normalize(&row, None);
        assert_eq!(
            normalized.field("LAST_MOD_DTTM"),
            Some(&DecodedValue::from("2023-11-14T22:13:20.000000+00:00"))
        );
        assert_eq!(
            normalized.field("ROW_COUNT"),
            Some(&DecodedValue::Long(1_700_000_000_000_000))
        );
    }

    #[test]
    fn test_timestamp_overflow_keeps_integer() {
        let normalizer = LogicalTypeNormalizer::default();
        let row = DecodedValue::record([("EXPIRY_TS", DecodedValue::Long(i64::MAX))]);
        assert_eq!(normalizer.normalize(&row, None), row);
    }

    #[test]
    fn test_timestamp_hint_flows_into_arrays_and_maps() {
        let normalizer = LogicalTypeNormalizer::default();
        let mut entries = BTreeMap::new();
        entries.insert("first".to_string(), DecodedValue::Long(0));
        let row = DecodedValue::record([
            ("SEEN_TS", DecodedValue::Array(vec![DecodedValue::Long(0)])),
            ("BY_SITE_TS", DecodedValue::Map(entries)),
        ]);
        let normalized = normalizer.normalize(&row, None);
        assert_eq!(
            normalized.field("SEEN_TS"),
            Some(&DecodedValue::Array(vec![DecodedValue::from(
                "1970-01-01T00:00:00.000000+00:00"
            )]))
        );
        let DecodedValue::Map(entries) = normalized.field("BY_SITE_TS").unwrap() else {
            panic!("expected map");
        };
        assert_eq!(
            entries.get("first"),
            Some(&DecodedValue::from("1970-01-01T00:00:00.000000+00:00"))
        );
    }

    #[test]
    fn test_top_level_integer_without_hint_is_unchanged() {
        let normalizer = LogicalTypeNormalizer::default();
        assert_eq!(
            normalizer.normalize(&DecodedValue::Long(5), None),
            DecodedValue::Long(5)
        );
        assert_eq!(
            normalizer.normalize(&DecodedValue::Long(0), Some("X_TS")),
            DecodedValue::from("1970-01-01T00:00:00.000000+00:00")
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = LogicalTypeNormalizer::default();
        let row = DecodedValue::record([
            ("ID", DecodedValue::from("1")),
            ("AMOUNT", decimal_record(2, &[0x30, 0x39])),
            ("LAST_MOD_DTTM", DecodedValue::Long(1_700_000_000_000_000)),
            ("BROKEN_TS", DecodedValue::Long(i64::MIN)),
            ("RAW", DecodedValue::Bytes(vec![9, 9])),
            ("FLAGS", DecodedValue::Array(vec![DecodedValue::Boolean(true)])),
        ]);
        let once = normalizer.normalize(&row, None);
        let twice = normalizer.normalize(&once, None);
        assert_eq!(once, twice);
    }
}
