//! Shared types for avro-cdc-tap.
//!
//! This crate holds everything that is independent of Kafka and of the
//! registry transport:
//!
//! - [`value`] - the [`DecodedValue`] tree produced by schema-directed decoding
//! - [`message`] - raw input messages and the JSON output envelope
//! - [`logical`] - logical types hidden inside plain primitives (scaled decimals, micro timestamps)
//! - [`normalize`] - the recursive [`LogicalTypeNormalizer`]
//! - [`json`] - the same decimal rule applied to schemaless JSON message keys
//!
//! # Architecture
//!
//! ```text
//! Avro bytes → DecodedValue → LogicalTypeNormalizer → OutputEnvelope → JSON line
//! key bytes  → UTF-8 → serde_json::Value → coerce_json_decimals → KeyRepr
//! ```

pub mod error;
pub mod json;
pub mod logical;
pub mod message;
pub mod normalize;
pub mod value;

pub use error::{CdcTypesError, Result};
pub use json::coerce_json_decimals;
pub use logical::{iso8601_to_micros, micros_to_iso8601, LogicalShape, ScaledDecimal};
pub use message::{KeyRepr, OutputEnvelope, RawMessage, CLIENT_NAME};
pub use normalize::{LogicalTypeNormalizer, TimestampFieldMatcher};
pub use value::{encode_base64, DecodedValue, BYTES_TAG};
