//! Kafka consumer for Debezium change events encoded as registry-described Avro.
//!
//! This crate provides:
//! - [`avro`] - header-length disambiguation and schemaless datum decoding
//! - [`processor`] - turning one raw message into an output envelope
//! - [`consumer`] - the message source abstraction and its rdkafka implementation
//! - [`sink`] - envelope output (JSON lines)
//! - [`sync`] - the consume loop and its CLI configuration
//!
//! ```text
//! MessageSource ─poll→ MessageProcessor ─→ EnvelopeSink
//!                        │
//!                        ├─ SchemaResolver (cached, single-flight)
//!                        ├─ FrameDecoder (header candidates, first success wins)
//!                        └─ LogicalTypeNormalizer
//! ```

pub mod avro;

/// Message sources: rdkafka-backed and in-memory
pub mod consumer;
pub mod error;
pub mod processor;
pub mod sink;
pub mod sync;

pub use avro::{
    bound_decode_allocations, AttemptOutcome, FrameAttempt, FrameDecodeError, FrameDecoder,
    FramedDecode, DEFAULT_HEADER_CANDIDATES,
};
pub use consumer::{ConsumerConfig, InMemorySource, KafkaMessageSource, MessageSource};
pub use error::{Error, Result};
pub use processor::{decode_key, MessageProcessor, ValueSelector};
pub use sink::{CollectingSink, EnvelopeSink, JsonLinesSink};
pub use sync::{consume, run_consume, Config, ConsumeOptions, ConsumeStats, StopReason};
