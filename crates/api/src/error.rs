//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use downstream::{FieldError, ServiceError};
use saga::SagaError;
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed credentials.
    Unauthorized(String),
    /// Request could not be decoded.
    BadRequest(String),
    /// A rental flow failed.
    Saga(SagaError),
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    message,
                    errors: None,
                },
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    message,
                    errors: Some(Vec::new()),
                },
            ),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(%status, message = %body.message, "request failed");
        }

        (status, Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, ErrorResponse) {
    let message = err.to_string();
    let (status, errors) = match err.service_error() {
        None => (StatusCode::BAD_REQUEST, Some(Vec::new())),
        Some(ServiceError::Validation { errors, .. }) => {
            (StatusCode::BAD_REQUEST, Some(errors.clone()))
        }
        Some(ServiceError::Forbidden { .. }) => (StatusCode::FORBIDDEN, None),
        Some(ServiceError::Internal { status, .. }) => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            None,
        ),
        Some(ServiceError::UnknownStatus { .. } | ServiceError::Unavailable { .. }) => {
            (StatusCode::SERVICE_UNAVAILABLE, None)
        }
    };

    (status, ErrorResponse { message, errors })
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}
