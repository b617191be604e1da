//! Retry messages and their JSON wire format.

use chrono::{DateTime, Utc};
use common::{CarId, PaymentId};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The compensation a message asks for. One topic per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryKind {
    CarUnbook,
    PaymentCancel,
}

impl RetryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryKind::CarUnbook => "car_unbook",
            RetryKind::PaymentCancel => "payment_cancel",
        }
    }
}

impl std::fmt::Display for RetryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload on the car-unbook topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarUnbook {
    pub car_uid: CarId,
    /// Missing on messages written by older producers; the log record
    /// timestamp is used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enqueued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempt: u32,
}

/// Payload on the payment-cancel topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCancel {
    pub payment_uid: PaymentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enqueued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempt: u32,
}

/// A request to retry one compensation until it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryMessage {
    CarUnbook(CarUnbook),
    PaymentCancel(PaymentCancel),
}

impl RetryMessage {
    /// First attempt to unbook `car_uid`, stamped now.
    pub fn car_unbook(car_uid: CarId) -> Self {
        RetryMessage::CarUnbook(CarUnbook {
            car_uid,
            enqueued_at: Some(Utc::now()),
            attempt: 0,
        })
    }

    /// First attempt to cancel `payment_uid`, stamped now.
    pub fn payment_cancel(payment_uid: PaymentId) -> Self {
        RetryMessage::PaymentCancel(PaymentCancel {
            payment_uid,
            enqueued_at: Some(Utc::now()),
            attempt: 0,
        })
    }

    pub fn kind(&self) -> RetryKind {
        match self {
            RetryMessage::CarUnbook(_) => RetryKind::CarUnbook,
            RetryMessage::PaymentCancel(_) => RetryKind::PaymentCancel,
        }
    }

    /// The id of the record the compensation targets; used as the log key.
    pub fn target(&self) -> String {
        match self {
            RetryMessage::CarUnbook(m) => m.car_uid.to_string(),
            RetryMessage::PaymentCancel(m) => m.payment_uid.to_string(),
        }
    }

    pub fn enqueued_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RetryMessage::CarUnbook(m) => m.enqueued_at,
            RetryMessage::PaymentCancel(m) => m.enqueued_at,
        }
    }

    pub fn attempt(&self) -> u32 {
        match self {
            RetryMessage::CarUnbook(m) => m.attempt,
            RetryMessage::PaymentCancel(m) => m.attempt,
        }
    }

    /// A fresh message for the same target, one attempt further, stamped now.
    pub fn next_attempt(&self) -> Self {
        let now = Some(Utc::now());
        match self {
            RetryMessage::CarUnbook(m) => RetryMessage::CarUnbook(CarUnbook {
                car_uid: m.car_uid,
                enqueued_at: now,
                attempt: m.attempt.saturating_add(1),
            }),
            RetryMessage::PaymentCancel(m) => RetryMessage::PaymentCancel(PaymentCancel {
                payment_uid: m.payment_uid,
                enqueued_at: now,
                attempt: m.attempt.saturating_add(1),
            }),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            RetryMessage::CarUnbook(m) => serde_json::to_vec(m)?,
            RetryMessage::PaymentCancel(m) => serde_json::to_vec(m)?,
        };
        Ok(bytes)
    }

    /// Decodes a payload read from the topic of `kind`.
    pub fn decode(kind: RetryKind, payload: &[u8]) -> Result<Self> {
        let message = match kind {
            RetryKind::CarUnbook => RetryMessage::CarUnbook(serde_json::from_slice(payload)?),
            RetryKind::PaymentCancel => {
                RetryMessage::PaymentCancel(serde_json::from_slice(payload)?)
            }
        };
        Ok(message)
    }
}
