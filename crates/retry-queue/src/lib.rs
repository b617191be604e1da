//! Durable retry queue for compensations that could not run inline.
//!
//! The request path enqueues a [`RetryMessage`] when a compensating call hits
//! an unavailable service. A [`RetryConsumer`] per topic claims messages,
//! waits out the dwell, re-issues the call with service credentials and
//! re-enqueues on failure.

pub mod backoff;
pub mod consumer;
pub mod error;
pub mod handler;
pub mod message;
pub mod producer;
pub mod publisher;

pub use backoff::{BackoffPolicy, CappedExponential, FixedDwell, RetryDecision};
pub use consumer::{RetryConsumer, Settlement};
pub use error::{Result, RetryQueueError};
pub use handler::{
    CarUnbookCompensation, Compensation, Outcome, PaymentCancelCompensation, RetryHandler,
};
pub use message::{CarUnbook, PaymentCancel, RetryKind, RetryMessage};
pub use producer::{KafkaRetryProducer, RetryTopics};
pub use publisher::{InMemoryRetryQueue, RetryPublisher};
