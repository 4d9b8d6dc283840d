//! The consume loop.
//!
//! Polls a [`MessageSource`] and writes one envelope per message until the
//! message budget is spent, or until the idle timeout passes before the
//! first message arrives. After the first message the loop keeps waiting for
//! more until the budget is reached.

use crate::avro::frame::{FrameDecoder, DEFAULT_HEADER_CANDIDATES};
use crate::consumer::{ConsumerConfig, KafkaMessageSource, MessageSource};
use crate::error::{Error, Result};
use crate::processor::{MessageProcessor, ValueSelector};
use crate::sink::EnvelopeSink;
use cdc_types::{LogicalTypeNormalizer, TimestampFieldMatcher};
use clap::Parser;
use schema_registry::{SchemaCoordinate, SchemaResolver};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Configuration for the `consume` command.
#[derive(Debug, Clone, Parser)]
pub struct Config {
    /// Kafka bootstrap servers
    #[clap(long, env = "KAFKA_BOOTSTRAP", default_value = "localhost:9092")]
    pub bootstrap: String,

    /// Topic to consume; a leading `^` subscribes by regex
    #[clap(long)]
    pub topic: String,

    /// Apicurio registry v2 base URL
    #[clap(
        long,
        env = "APICURIO_URL",
        default_value = "http://localhost:8081/apis/registry/v2"
    )]
    pub registry_url: String,

    /// Apicurio group id
    #[clap(long, env = "APICURIO_GROUP", default_value = "oracle-esw")]
    pub registry_group: String,

    /// Artifact id of the value schema (defaults to `<topic>-value`)
    #[clap(long)]
    pub artifact_id: Option<String>,

    /// Stop after this many messages
    #[clap(long, default_value_t = 5)]
    pub max_messages: usize,

    /// Start from the earliest offset when the group has no committed offsets
    #[clap(long)]
    pub from_beginning: bool,

    /// What to print from the Debezium envelope
    #[clap(long = "print", value_enum, default_value_t = ValueSelector::After)]
    pub print: ValueSelector,

    /// Stop if no message arrives within this many seconds
    #[clap(long, default_value_t = 30.0, allow_negative_numbers = true)]
    pub timeout_seconds: f64,

    /// Upper bound on a single poll, in milliseconds
    #[clap(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Consumer group id (defaults to `consume-avro-<topic>`)
    #[clap(long)]
    pub group_id: Option<String>,

    /// Header lengths to try before the Avro payload
    #[clap(long, value_delimiter = ',', default_values_t = DEFAULT_HEADER_CANDIDATES)]
    pub header_candidates: Vec<usize>,

    /// Extra field name to treat as a microsecond timestamp
    #[clap(long = "timestamp-field", value_name = "NAME")]
    pub timestamp_fields: Vec<String>,

    /// Extra field-name suffix to treat as a microsecond timestamp
    #[clap(long = "timestamp-suffix", value_name = "SUFFIX")]
    pub timestamp_suffixes: Vec<String>,

    /// TOML file with `exact` and `suffixes` lists replacing the built-in timestamp rules
    #[clap(long)]
    pub timestamp_rules: Option<PathBuf>,
}

impl Config {
    pub fn group_id(&self) -> String {
        self.group_id
            .clone()
            .unwrap_or_else(|| format!("consume-avro-{}", self.topic))
    }

    pub fn is_pattern(&self) -> bool {
        self.topic.starts_with('^')
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            brokers: self.bootstrap.clone(),
            group_id: self.group_id(),
            topic: self.topic.clone(),
            auto_offset_reset: if self.from_beginning {
                "earliest".to_string()
            } else {
                "latest".to_string()
            },
            ..Default::default()
        }
    }

    /// The coordinate that must resolve before consuming starts.
    ///
    /// `None` for a pattern subscription without an explicit artifact: each
    /// matched topic then resolves its own `<topic>-value` on first use.
    pub fn startup_coordinate(&self) -> Option<SchemaCoordinate> {
        match (&self.artifact_id, self.is_pattern()) {
            (Some(id), _) => Some(SchemaCoordinate::new(self.registry_group.clone(), id.clone())),
            (None, false) => Some(SchemaCoordinate::topic_value(
                self.registry_group.clone(),
                &self.topic,
            )),
            (None, true) => None,
        }
    }

    /// Built-in rules (or the rules file), plus any extra names and suffixes.
    pub fn timestamp_matcher(&self) -> Result<TimestampFieldMatcher> {
        let mut matcher = match &self.timestamp_rules {
            Some(path) => TimestampFieldMatcher::from_file(path)?,
            None => TimestampFieldMatcher::default(),
        };
        for name in &self.timestamp_fields {
            matcher = matcher.with_exact(name.clone());
        }
        for suffix in &self.timestamp_suffixes {
            matcher = matcher.with_suffix(suffix.clone());
        }
        Ok(matcher)
    }

    pub fn processor(&self, resolver: Arc<SchemaResolver>) -> Result<MessageProcessor> {
        if self.header_candidates.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one header candidate is required".to_string(),
            ));
        }
        Ok(MessageProcessor::new(resolver, self.registry_group.clone())
            .with_artifact_id(self.artifact_id.clone())
            .with_frame_decoder(FrameDecoder::new(self.header_candidates.iter().copied()))
            .with_normalizer(LogicalTypeNormalizer::new(self.timestamp_matcher()?))
            .with_selector(self.print))
    }

    pub fn options(&self) -> ConsumeOptions {
        ConsumeOptions {
            max_messages: self.max_messages,
            idle_timeout: seconds(self.timeout_seconds),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }
}

/// Non-positive and NaN mean zero; anything too large for a `Duration` saturates.
fn seconds(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOptions {
    /// Stop once this many messages have been emitted.
    pub max_messages: usize,
    /// How long to wait for the first message.
    pub idle_timeout: Duration,
    /// Upper bound on one poll.
    pub poll_interval: Duration,
}

impl Default for ConsumeOptions {
    fn default() -> Self {
        Self {
            max_messages: 5,
            idle_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxMessages,
    IdleTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeStats {
    pub processed: usize,
    pub decode_failures: usize,
    pub source_errors: usize,
    pub stop_reason: StopReason,
}

/// Drive `source` through `processor` into `sink`.
///
/// Messages are handled one at a time in arrival order; a message that has
/// been polled is always emitted before the stop conditions are checked
/// again. Source errors are logged and skipped. Only sink errors abort.
pub async fn run_consume<S, K>(
    source: &mut S,
    processor: &MessageProcessor,
    sink: &mut K,
    options: &ConsumeOptions,
) -> Result<ConsumeStats>
where
    S: MessageSource + ?Sized,
    K: EnvelopeSink + ?Sized,
{
    // `None` when the timeout is too large to represent: wait forever.
    let deadline = Instant::now().checked_add(options.idle_timeout);
    let mut processed = 0usize;
    let mut decode_failures = 0usize;
    let mut source_errors = 0usize;

    let stop_reason = loop {
        if processed >= options.max_messages {
            break StopReason::MaxMessages;
        }
        if processed == 0 && deadline.is_some_and(|d| Instant::now() > d) {
            break StopReason::IdleTimeout;
        }

        let message = match source.poll(options.poll_interval).await {
            None => continue,
            Some(Err(e)) => {
                warn!("Kafka poll error: {e}");
                source_errors += 1;
                continue;
            }
            Some(Ok(message)) => message,
        };

        let envelope = processor.process(&message).await;
        if envelope.is_decode_failure() {
            decode_failures += 1;
        }
        sink.emit(&envelope)?;
        processed += 1;
    };

    let stats = ConsumeStats {
        processed,
        decode_failures,
        source_errors,
        stop_reason,
    };
    info!(
        "Consume finished ({:?}): {} message(s), {} undecodable, {} source error(s)",
        stats.stop_reason, stats.processed, stats.decode_failures, stats.source_errors
    );
    Ok(stats)
}

/// Consume from Kafka as described by `config`, writing to `sink`.
pub async fn consume<K>(
    config: &Config,
    resolver: Arc<SchemaResolver>,
    sink: &mut K,
) -> Result<ConsumeStats>
where
    K: EnvelopeSink + ?Sized,
{
    let processor = config.processor(resolver)?;
    let consumer_config = config.consumer_config();
    info!(
        "Consuming {} as group {} (header candidates {:?})",
        consumer_config.topic,
        consumer_config.group_id,
        processor.frame_decoder().candidates()
    );

    let mut source = KafkaMessageSource::new(&consumer_config)?;
    let result = run_consume(&mut source, &processor, sink, &config.options()).await;
    source.close().await;
    result
}
