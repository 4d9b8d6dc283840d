use crate::error::{Error, Result};
use async_trait::async_trait;
use cdc_types::RawMessage;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer as RdkafkaConsumer, StreamConsumer as RdkafkaStreamConsumer};
use rdkafka::message::{BorrowedMessage as RdkafkaBorrowedMessage, Message as RdkafkaMessage};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Configuration for the Kafka consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Consumer group ID
    pub group_id: String,
    /// Topic name, or a regex subscription when it starts with `^`
    pub topic: String,
    /// Auto offset reset strategy ("earliest" or "latest")
    ///
    /// Only applies when the group has no committed offsets.
    pub auto_offset_reset: String,
    /// Session timeout in milliseconds
    pub session_timeout_ms: String,
    /// Enable auto commit (off by default; offsets are never committed manually either)
    pub enable_auto_commit: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "avro-cdc-tap".to_string(),
            topic: "".to_string(),
            auto_offset_reset: "latest".to_string(),
            session_timeout_ms: "6000".to_string(),
            enable_auto_commit: false,
        }
    }
}

/// Anything that hands out raw messages one at a time.
#[async_trait]
pub trait MessageSource: Send {
    /// Wait up to `timeout` for the next message.
    ///
    /// `None` means nothing arrived in time; end of stream looks the same.
    /// `Some(Err(_))` is a per-message error reported by the source.
    async fn poll(&mut self, timeout: Duration) -> Option<Result<RawMessage>>;

    /// Release the subscription.
    async fn close(&mut self) {}
}

/// [`MessageSource`] backed by an rdkafka stream consumer.
pub struct KafkaMessageSource {
    consumer: RdkafkaStreamConsumer,
}

impl KafkaMessageSource {
    /// Create the consumer and subscribe to `config.topic`.
    ///
    /// librdkafka treats topic names starting with `^` as regex patterns.
    pub fn new(config: &ConsumerConfig) -> Result<Self> {
        let consumer: RdkafkaStreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", config.enable_auto_commit.to_string())
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("session.timeout.ms", &config.session_timeout_ms)
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| Error::Consumer(format!("Failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[&config.topic])
            .map_err(|e| Error::Consumer(format!("Failed to subscribe to topic: {e}")))?;
        debug!(
            "Subscribed to {} as group {}",
            config.topic, config.group_id
        );

        Ok(Self { consumer })
    }
}

fn to_raw_message(msg: &RdkafkaBorrowedMessage) -> RawMessage {
    RawMessage {
        topic: msg.topic().to_string(),
        partition: msg.partition(),
        offset: msg.offset(),
        timestamp: msg.timestamp().to_millis(),
        key: msg.key().map(|k| k.to_vec()),
        value: msg.payload().map(|p| p.to_vec()),
    }
}

#[async_trait]
impl MessageSource for KafkaMessageSource {
    async fn poll(&mut self, timeout: Duration) -> Option<Result<RawMessage>> {
        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Ok(Ok(msg)) => Some(Ok(to_raw_message(&msg))),
            Ok(Err(e)) => Some(Err(Error::Kafka(e))),
            Err(_) => None,
        }
    }

    async fn close(&mut self) {
        self.consumer.unsubscribe();
    }
}

/// [`MessageSource`] over a fixed queue of messages and errors.
///
/// Once drained, every poll waits out its full timeout and returns `None`,
/// like an idle topic.
#[derive(Debug, Default)]
pub struct InMemorySource {
    queue: VecDeque<Result<RawMessage>>,
    polls: usize,
}

impl InMemorySource {
    pub fn new(messages: impl IntoIterator<Item = RawMessage>) -> Self {
        Self {
            queue: messages.into_iter().map(Ok).collect(),
            polls: 0,
        }
    }

    pub fn push(&mut self, message: RawMessage) {
        self.queue.push_back(Ok(message));
    }

    /// Queue a source-reported error.
    pub fn push_error(&mut self, reason: impl Into<String>) {
        self.queue.push_back(Err(Error::Consumer(reason.into())));
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn poll_count(&self) -> usize {
        self.polls
    }
}

#[async_trait]
impl MessageSource for InMemorySource {
    async fn poll(&mut self, timeout: Duration) -> Option<Result<RawMessage>> {
        self.polls += 1;
        match self.queue.pop_front() {
            Some(item) => Some(item),
            None => {
                tokio::time::sleep(timeout).await;
                None
            }
        }
    }
}
