//! Per-message retry logic, independent of the log transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use downstream::{CarsService, Credentials, PaymentService, ServiceError};
use tracing::{error, info, warn};

use crate::backoff::{BackoffPolicy, FixedDwell, RetryDecision};
use crate::error::Result;
use crate::message::{RetryKind, RetryMessage};
use crate::publisher::RetryPublisher;

/// A compensating call the retry path can repeat.
#[async_trait]
pub trait Compensation: Send + Sync {
    /// The message kind this compensation consumes.
    fn kind(&self) -> RetryKind;

    /// Runs the compensation with service-level credentials.
    async fn compensate(&self, message: &RetryMessage) -> std::result::Result<(), ServiceError>;
}

/// Makes a car available again.
pub struct CarUnbookCompensation {
    cars: Arc<dyn CarsService>,
}

impl CarUnbookCompensation {
    pub fn new(cars: Arc<dyn CarsService>) -> Self {
        Self { cars }
    }
}

#[async_trait]
impl Compensation for CarUnbookCompensation {
    fn kind(&self) -> RetryKind {
        RetryKind::CarUnbook
    }

    async fn compensate(&self, message: &RetryMessage) -> std::result::Result<(), ServiceError> {
        match message {
            RetryMessage::CarUnbook(m) => {
                match self.cars.unbook(m.car_uid, &Credentials::Service).await {
                    // An earlier attempt that timed out may have gone through.
                    Err(ServiceError::Internal { status: 409, .. }) => {
                        info!(car_uid = %m.car_uid, "car already available");
                        Ok(())
                    }
                    result => result,
                }
            }
            RetryMessage::PaymentCancel(_) => Err(ServiceError::validation(
                "payment cancel message on car unbook topic",
            )),
        }
    }
}

/// Cancels a payment.
pub struct PaymentCancelCompensation {
    payment: Arc<dyn PaymentService>,
}

impl PaymentCancelCompensation {
    pub fn new(payment: Arc<dyn PaymentService>) -> Self {
        Self { payment }
    }
}

#[async_trait]
impl Compensation for PaymentCancelCompensation {
    fn kind(&self) -> RetryKind {
        RetryKind::PaymentCancel
    }

    async fn compensate(&self, message: &RetryMessage) -> std::result::Result<(), ServiceError> {
        match message {
            RetryMessage::PaymentCancel(m) => {
                self.payment
                    .cancel(m.payment_uid, &Credentials::Service)
                    .await
            }
            RetryMessage::CarUnbook(_) => Err(ServiceError::validation(
                "car unbook message on payment cancel topic",
            )),
        }
    }
}

/// How a claimed message was settled. Every outcome means the message may be
/// acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Payload was missing or malformed; dropped without retry.
    Dropped,
    /// The compensation succeeded.
    Completed,
    /// The compensation failed and a new message was published.
    Requeued,
    /// The compensation failed and the backoff policy gave up.
    Abandoned,
}

/// Decodes, waits, compensates and re-publishes on failure.
pub struct RetryHandler<B: BackoffPolicy = FixedDwell> {
    compensation: Arc<dyn Compensation>,
    publisher: Arc<dyn RetryPublisher>,
    backoff: B,
}

impl<B: BackoffPolicy> RetryHandler<B> {
    pub fn new(
        compensation: Arc<dyn Compensation>,
        publisher: Arc<dyn RetryPublisher>,
        backoff: B,
    ) -> Self {
        Self {
            compensation,
            publisher,
            backoff,
        }
    }

    pub fn kind(&self) -> RetryKind {
        self.compensation.kind()
    }

    /// Processes one claimed payload.
    ///
    /// An `Err` means the follow-up message could not be published; the
    /// claimed message must then stay unacknowledged so the log redelivers it.
    #[tracing::instrument(skip(self, payload), fields(kind = %self.kind()))]
    pub async fn handle(
        &self,
        payload: Option<&[u8]>,
        record_timestamp: Option<DateTime<Utc>>,
    ) -> Result<Outcome> {
        let Some(payload) = payload else {
            error!("retry message without payload");
            return Ok(self.settle(Outcome::Dropped));
        };

        info!(value = %String::from_utf8_lossy(payload), "message claimed");

        let message = match RetryMessage::decode(self.kind(), payload) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "malformed retry message");
                return Ok(self.settle(Outcome::Dropped));
            }
        };

        let reference = message.enqueued_at().or(record_timestamp);
        let wait = remaining_dwell(reference, self.backoff.dwell(message.attempt()), Utc::now());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let target = message.target();
        match self.compensation.compensate(&message).await {
            Ok(()) => {
                info!(%target, attempt = message.attempt(), "compensation completed");
                Ok(self.settle(Outcome::Completed))
            }
            Err(e) => {
                warn!(%target, attempt = message.attempt(), error = %e, "compensation failed");
                match self.backoff.on_failure(message.attempt()) {
                    RetryDecision::Retry => {
                        self.publisher
                            .publish_confirmed(message.next_attempt())
                            .await?;
                        Ok(self.settle(Outcome::Requeued))
                    }
                    RetryDecision::GiveUp => {
                        error!(%target, attempt = message.attempt(), "giving up on compensation");
                        Ok(self.settle(Outcome::Abandoned))
                    }
                }
            }
        }
    }

    fn settle(&self, outcome: Outcome) -> Outcome {
        let label = match outcome {
            Outcome::Dropped => "dropped",
            Outcome::Completed => "completed",
            Outcome::Requeued => "requeued",
            Outcome::Abandoned => "abandoned",
        };
        metrics::counter!(
            "retry_processed_total",
            "kind" => self.kind().as_str(),
            "outcome" => label
        )
        .increment(1);
        outcome
    }
}

/// Time left until `reference + dwell`; the full dwell when there is no
/// reference instant.
fn remaining_dwell(
    reference: Option<DateTime<Utc>>,
    dwell: Duration,
    now: DateTime<Utc>,
) -> Duration {
    let Some(reference) = reference else {
        return dwell;
    };
    let elapsed = (now - reference).to_std().unwrap_or(Duration::ZERO);
    dwell.saturating_sub(elapsed)
}
