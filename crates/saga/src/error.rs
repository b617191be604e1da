//! Saga error types.

use downstream::ServiceError;
use thiserror::Error;

/// Errors surfaced by the rental flows.
///
/// Every variant carries the label of the step that failed; the label is the
/// prefix of the rendered message.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The request was rejected before any remote call.
    #[error("{step}: {message}")]
    InvalidRequest { step: &'static str, message: String },

    /// A downstream call failed.
    #[error("{step}: {source}")]
    Step {
        step: &'static str,
        source: ServiceError,
    },

    /// A downstream call failed without a usable answer; the detail is kept
    /// for logs but not rendered.
    #[error("{step}")]
    Hidden {
        step: &'static str,
        source: ServiceError,
    },
}

impl SagaError {
    pub fn invalid(step: &'static str, message: impl Into<String>) -> Self {
        SagaError::InvalidRequest {
            step,
            message: message.into(),
        }
    }

    pub fn step(step: &'static str, source: ServiceError) -> Self {
        SagaError::Step { step, source }
    }

    /// Like [`SagaError::step`], but hides the message of errors that carry
    /// no answer from the callee.
    pub fn hiding_unavailable(step: &'static str, source: ServiceError) -> Self {
        if source.is_unavailable() {
            SagaError::Hidden { step, source }
        } else {
            SagaError::Step { step, source }
        }
    }

    /// Label of the step that failed.
    pub fn step_label(&self) -> &'static str {
        match self {
            SagaError::InvalidRequest { step, .. }
            | SagaError::Step { step, .. }
            | SagaError::Hidden { step, .. } => step,
        }
    }

    /// The downstream error behind this failure, if any.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            SagaError::InvalidRequest { .. } => None,
            SagaError::Step { source, .. } | SagaError::Hidden { source, .. } => Some(source),
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
