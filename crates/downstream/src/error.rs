//! Downstream error taxonomy and its classification predicates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level complaint inside a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

/// Errors returned by the downstream service clients.
///
/// The variants form a closed set; every decision point in the saga matches
/// on them exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The callee rejected the request as invalid (HTTP 400).
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    /// The callee refused access to a resource owned by someone else (HTTP 403).
    #[error("{message}")]
    Forbidden { message: String },

    /// The callee answered with a definitive failure status.
    #[error("{message}")]
    Internal { status: u16, message: String },

    /// The callee answered with a status code this client does not expect.
    #[error("unknown response status {status}")]
    UnknownStatus { status: u16 },

    /// No usable answer: connection refused, timeout, truncated body.
    #[error("{message}")]
    Unavailable { message: String },
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn internal(status: u16, message: impl Into<String>) -> Self {
        ServiceError::Internal {
            status,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ServiceError::Unavailable {
            message: message.into(),
        }
    }

    /// True iff the failure is the caller's fault.
    pub fn is_caller_fault(&self) -> bool {
        match self {
            ServiceError::Validation { .. } => true,
            ServiceError::Forbidden { .. }
            | ServiceError::Internal { .. }
            | ServiceError::UnknownStatus { .. }
            | ServiceError::Unavailable { .. } => false,
        }
    }

    /// True iff the callee gave no definitive answer, so a later retry may
    /// still succeed.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ServiceError::Validation { .. }
            | ServiceError::Forbidden { .. }
            | ServiceError::Internal { .. } => false,
            ServiceError::UnknownStatus { .. } | ServiceError::Unavailable { .. } => true,
        }
    }
}

/// Error body shape shared by the backend services.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

impl ErrorBody {
    /// Parses an error body, falling back to the raw text when the service
    /// did not answer with JSON.
    pub(crate) fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_else(|_| ErrorBody {
            message: String::from_utf8_lossy(body).trim().to_string(),
            errors: Vec::new(),
        })
    }
}

/// Convenience type alias for downstream results.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_caller_fault() {
        let err = ServiceError::validation("bad price");
        assert!(err.is_caller_fault());
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_definitive_answers_are_not_unavailable() {
        let internal = ServiceError::internal(409, "car already booked");
        let forbidden = ServiceError::Forbidden {
            message: "not your rental".to_string(),
        };

        for err in [internal, forbidden] {
            assert!(!err.is_caller_fault());
            assert!(!err.is_unavailable());
        }
    }

    #[test]
    fn test_transport_and_unknown_status_are_unavailable() {
        let transport = ServiceError::unavailable("connection refused");
        let unknown = ServiceError::UnknownStatus { status: 418 };

        for err in [transport, unknown] {
            assert!(!err.is_caller_fault());
            assert!(err.is_unavailable());
        }
    }

    #[test]
    fn test_error_body_parses_field_errors() {
        let body = br#"{"message":"invalid","errors":[{"field":"price","error":"gte"}]}"#;
        let parsed = ErrorBody::parse(body);
        assert_eq!(parsed.message, "invalid");
        assert_eq!(
            parsed.errors,
            vec![FieldError {
                field: "price".to_string(),
                error: "gte".to_string()
            }]
        );
    }

    #[test]
    fn test_error_body_falls_back_to_text() {
        let parsed = ErrorBody::parse(b"upstream connect error\n");
        assert_eq!(parsed.message, "upstream connect error");
        assert!(parsed.errors.is_empty());
    }
}
