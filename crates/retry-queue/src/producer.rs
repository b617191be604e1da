//! Kafka-backed retry publisher.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::{error, info};

use crate::error::{Result, RetryQueueError};
use crate::message::{RetryKind, RetryMessage};
use crate::publisher::RetryPublisher;

/// Topic names, one per compensation kind.
#[derive(Debug, Clone)]
pub struct RetryTopics {
    pub car_unbook: String,
    pub payment_cancel: String,
}

impl RetryTopics {
    pub fn for_kind(&self, kind: RetryKind) -> &str {
        match kind {
            RetryKind::CarUnbook => &self.car_unbook,
            RetryKind::PaymentCancel => &self.payment_cancel,
        }
    }
}

/// The log record carrying one retry message: keyed by the target id and
/// stamped with the message's enqueue time.
#[derive(Debug)]
struct OutgoingRecord {
    key: String,
    payload: Vec<u8>,
    timestamp: Option<i64>,
}

impl OutgoingRecord {
    fn from_message(message: &RetryMessage) -> Result<Self> {
        Ok(Self {
            key: message.target(),
            payload: message.encode()?,
            timestamp: message.enqueued_at().map(|at| at.timestamp_millis()),
        })
    }
}

/// Publishes retry messages to Kafka.
#[derive(Clone)]
pub struct KafkaRetryProducer {
    producer: FutureProducer,
    topics: RetryTopics,
}

impl KafkaRetryProducer {
    pub fn new(brokers: &str, client_id: &str, topics: RetryTopics) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", client_id)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer, topics })
    }

    /// Waits for in-flight messages to be delivered.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        self.producer.flush(Timeout::After(timeout))?;
        Ok(())
    }

    async fn send(
        producer: &FutureProducer,
        topic: &str,
        message: &RetryMessage,
    ) -> Result<()> {
        let outgoing = OutgoingRecord::from_message(message)?;
        let mut record = FutureRecord::to(topic)
            .key(&outgoing.key)
            .payload(&outgoing.payload);
        if let Some(timestamp) = outgoing.timestamp {
            record = record.timestamp(timestamp);
        }

        match producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(
                    topic,
                    key = %outgoing.key,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    attempt = message.attempt(),
                    "retry message published"
                );
                metrics::counter!("retry_enqueued_total", "kind" => message.kind().as_str())
                    .increment(1);
                Ok(())
            }
            Err((e, _msg)) => Err(RetryQueueError::Kafka(e)),
        }
    }
}

#[async_trait]
impl RetryPublisher for KafkaRetryProducer {
    fn publish(&self, message: RetryMessage) {
        let producer = self.producer.clone();
        let topic = self.topics.for_kind(message.kind()).to_string();

        tokio::spawn(async move {
            if let Err(e) = Self::send(&producer, &topic, &message).await {
                error!(
                    topic,
                    target = %message.target(),
                    error = %e,
                    "failed to publish retry message"
                );
            }
        });
    }

    async fn publish_confirmed(&self, message: RetryMessage) -> Result<()> {
        let topic = self.topics.for_kind(message.kind());
        Self::send(&self.producer, topic, &message).await
    }
}
