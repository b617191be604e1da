//! Retry queue error types.

use rdkafka::error::KafkaError;
use thiserror::Error;

/// Errors that can occur while publishing or consuming retry messages.
#[derive(Debug, Error)]
pub enum RetryQueueError {
    /// Broker client error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// Payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A message could not be handed to the log.
    #[error("Publish failed: {0}")]
    Publish(String),
}

/// Convenience type alias for retry queue results.
pub type Result<T> = std::result::Result<T, RetryQueueError>;
