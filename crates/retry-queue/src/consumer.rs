//! Kafka consumer loop driving a [`RetryHandler`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use rdkafka::Offset;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::backoff::BackoffPolicy;
use crate::error::Result;
use crate::handler::{Outcome, RetryHandler};

const REDELIVERY_PAUSE: Duration = Duration::from_secs(1);
const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// What happens to a claimed message's offset once the handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The outcome is decided; the offset may be committed.
    Commit,
    /// The follow-up could not be published; the message is read again.
    Redeliver,
}

impl Settlement {
    pub fn of(result: &Result<Outcome>) -> Self {
        match result {
            Ok(_) => Settlement::Commit,
            Err(_) => Settlement::Redeliver,
        }
    }
}

/// Client settings for a retry consumer: manual commits, reading from the
/// start of the topic when the group has no committed offset.
pub(crate) fn consumer_config(brokers: &str, group_id: &str) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", brokers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest");
    config
}

/// Consumes one retry topic as a member of a consumer group.
///
/// Offsets are committed only after a message has been settled, so a crash
/// mid-message leads to redelivery rather than loss. A message whose
/// follow-up could not be published is read again by seeking back to it.
pub struct RetryConsumer<B: BackoffPolicy> {
    consumer: StreamConsumer,
    topic: String,
    handler: RetryHandler<B>,
}

impl<B: BackoffPolicy + 'static> RetryConsumer<B> {
    pub fn new(brokers: &str, group_id: &str, topic: &str, handler: RetryHandler<B>) -> Result<Self> {
        let consumer: StreamConsumer = consumer_config(brokers, group_id).create()?;

        consumer.subscribe(&[topic])?;

        Ok(Self {
            consumer,
            topic: topic.to_string(),
            handler,
        })
    }

    /// Runs the consume loop on its own task until `shutdown` flips to true.
    ///
    /// Shutdown is observed between messages; a message being handled is
    /// always finished first.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(topic = %self.topic, kind = %self.handler.kind(), "retry consumer started");

            loop {
                if *shutdown.borrow() {
                    break;
                }

                let message = tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    received = self.consumer.recv() => received,
                };

                let message = match message {
                    Ok(message) => message,
                    Err(e) => {
                        error!(topic = %self.topic, error = %e, "kafka receive failed");
                        continue;
                    }
                };

                let record_timestamp = message
                    .timestamp()
                    .to_millis()
                    .and_then(DateTime::<Utc>::from_timestamp_millis);

                let result = self.handler.handle(message.payload(), record_timestamp).await;
                let (partition, offset) = (message.partition(), message.offset());

                match Settlement::of(&result) {
                    Settlement::Commit => {
                        if let Err(e) = self.consumer.commit_message(&message, CommitMode::Async) {
                            warn!(
                                topic = %self.topic,
                                partition,
                                offset,
                                error = %e,
                                "offset commit failed"
                            );
                        }
                    }
                    Settlement::Redeliver => {
                        if let Err(e) = &result {
                            error!(
                                topic = %self.topic,
                                partition,
                                offset,
                                error = %e,
                                "could not re-enqueue retry message"
                            );
                        }
                        tokio::time::sleep(REDELIVERY_PAUSE).await;
                        if let Err(e) = self.consumer.seek(
                            &self.topic,
                            partition,
                            Offset::Offset(offset),
                            SEEK_TIMEOUT,
                        ) {
                            error!(topic = %self.topic, partition, offset, error = %e, "seek back failed");
                        }
                    }
                }
            }

            info!(topic = %self.topic, "retry consumer stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetryQueueError;

    #[test]
    fn test_every_outcome_commits() {
        for outcome in [
            Outcome::Dropped,
            Outcome::Completed,
            Outcome::Requeued,
            Outcome::Abandoned,
        ] {
            assert_eq!(Settlement::of(&Ok(outcome)), Settlement::Commit);
        }
    }

    #[test]
    fn test_failed_requeue_is_redelivered() {
        let result = Err(RetryQueueError::Publish("broker unreachable".to_string()));
        assert_eq!(Settlement::of(&result), Settlement::Redeliver);
    }

    #[test]
    fn test_consumer_commits_manually_from_earliest() {
        let config = consumer_config("kafka:9092", "car-rental-system");
        assert_eq!(config.get("bootstrap.servers"), Some("kafka:9092"));
        assert_eq!(config.get("group.id"), Some("car-rental-system"));
        assert_eq!(config.get("enable.auto.commit"), Some("false"));
        assert_eq!(config.get("auto.offset.reset"), Some("earliest"));
    }
}
