//! Logical types carried by plain Avro primitives.
//!
//! Debezium encodes two common column kinds without Avro logical-type
//! annotations:
//!
//! - `VariableScaleDecimal`: a record `{scale: int, value: bytes}` where
//!   `value` is a signed big-endian two's-complement unscaled integer.
//!   It is structurally self-describing.
//! - `MicroTimestamp`: a plain `long` of microseconds since the Unix epoch.
//!   Nothing in the schema distinguishes it from any other long, so it is
//!   only recognised by field name (see [`crate::normalize`]).

use crate::value::DecodedValue;
use chrono::{DateTime, Datelike, Utc};
use num_bigint::{BigInt, Sign};

/// Largest scale (in either direction) rendered as a plain decimal string.
const MAX_RENDERED_SCALE: u32 = 4096;

/// A logical value recognised in a decoded tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalShape {
    ScaledDecimal(ScaledDecimal),
    MicroTimestamp(i64),
}

impl LogicalShape {
    /// Recognise the `{scale, value}` decimal shape in a record's fields.
    ///
    /// The field set must be exactly `{scale, value}`, with `scale` an
    /// integer that fits `i32` and `value` a byte sequence.
    pub fn from_record_fields(fields: &[(String, DecodedValue)]) -> Option<Self> {
        if fields.len() != 2 {
            return None;
        }
        let mut scale = None;
        let mut unscaled = None;
        for (name, value) in fields {
            match (name.as_str(), value) {
                ("scale", v) => scale = v.as_integer().and_then(|s| i32::try_from(s).ok()),
                ("value", DecodedValue::Bytes(bytes)) => unscaled = Some(bytes.clone()),
                _ => return None,
            }
        }
        Some(LogicalShape::ScaledDecimal(ScaledDecimal::new(scale?, unscaled?)))
    }

    /// Canonical string form, or `None` when the value cannot be represented.
    pub fn render(&self) -> Option<String> {
        match self {
            LogicalShape::ScaledDecimal(decimal) => decimal.to_decimal_string(),
            LogicalShape::MicroTimestamp(micros) => micros_to_iso8601(*micros),
        }
    }
}

/// An unscaled big-endian integer plus a decimal scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledDecimal {
    pub scale: i32,
    pub unscaled: Vec<u8>,
}

impl ScaledDecimal {
    pub fn new(scale: i32, unscaled: Vec<u8>) -> Self {
        Self { scale, unscaled }
    }

    /// Build from an integer, encoding it the way Debezium does.
    pub fn from_bigint(unscaled: &BigInt, scale: i32) -> Self {
        Self::new(scale, unscaled.to_signed_bytes_be())
    }

    /// The unscaled magnitude. An empty byte sequence is zero.
    pub fn unscaled_value(&self) -> BigInt {
        BigInt::from_signed_bytes_be(&self.unscaled)
    }

    /// Exact decimal string of `unscaled × 10^(-scale)`.
    ///
    /// `scale = 0` gives an integer string, `scale > 0` gives exactly `scale`
    /// fractional digits, `scale < 0` appends zeros. Returns `None` when the
    /// scale is too large to render.
    pub fn to_decimal_string(&self) -> Option<String> {
        if self.scale.unsigned_abs() > MAX_RENDERED_SCALE {
            return None;
        }
        let unscaled = self.unscaled_value();
        let sign = if unscaled.sign() == Sign::Minus { "-" } else { "" };
        let digits = unscaled.magnitude().to_string();

        if self.scale <= 0 {
            let zeros = if digits == "0" {
                0
            } else {
                self.scale.unsigned_abs() as usize
            };
            return Some(format!("{sign}{digits}{}", "0".repeat(zeros)));
        }

        let scale = self.scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{digits}", "0".repeat(scale + 1 - digits.len()))
        } else {
            digits
        };
        let (integer, fraction) = padded.split_at(padded.len() - scale);
        Some(format!("{sign}{integer}.{fraction}"))
    }
}

/// Render microseconds since the epoch as ISO-8601 UTC with microsecond precision.
///
/// Returns `None` outside years 1..=9999.
pub fn micros_to_iso8601(micros: i64) -> Option<String> {
    let datetime = DateTime::<Utc>::from_timestamp_micros(micros)?;
    if !(1..=9999).contains(&datetime.year()) {
        return None;
    }
    Some(datetime.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string())
}

/// Parse an ISO-8601 / RFC 3339 timestamp back to microseconds since the epoch.
pub fn iso8601_to_micros(text: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|datetime| datetime.timestamp_micros())
}
