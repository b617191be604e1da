//! Shared HTTP plumbing for the downstream clients.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ErrorBody, Result, ServiceError};

/// Header carrying the shared secret on service-to-service calls.
pub const SERVICE_PASSWORD_HEADER: &str = "Service-Password";

/// Who the gateway is calling on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// The end user's bearer token, forwarded verbatim.
    Bearer(String),
    /// The gateway itself, authenticated with the shared service secret.
    Service,
}

/// A base URL plus the HTTP client and secrets needed to reach one service.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    service_password: String,
}

impl HttpTransport {
    /// Creates a transport for the service rooted at `base_url`.
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        service_password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_password: service_password.into(),
        }
    }

    /// Builds the shared reqwest client with a per-request timeout.
    pub fn client_with_timeout(timeout: Duration) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder().timeout(timeout).build()
    }

    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        credentials: &Credentials,
    ) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match credentials {
            Credentials::Bearer(token) => builder.bearer_auth(token),
            Credentials::Service => {
                builder.header(SERVICE_PASSWORD_HEADER, self.service_password.as_str())
            }
        }
    }

    /// Sends the request and decodes a JSON payload on `expected` status.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<T> {
        let body = self.send(request, expected).await?;
        serde_json::from_slice(&body)
            .map_err(|e| ServiceError::unavailable(format!("decode response: {e}")))
    }

    /// Sends the request and discards the payload on `expected` status.
    pub(crate) async fn execute(&self, request: RequestBuilder, expected: StatusCode) -> Result<()> {
        self.send(request, expected).await.map(|_| ())
    }

    async fn send(&self, request: RequestBuilder, expected: StatusCode) -> Result<Vec<u8>> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "downstream request failed");
            ServiceError::unavailable(e.to_string())
        })?;

        let status = response.status();
        // Drain the body on every path so the connection returns to the pool.
        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::unavailable(format!("read response body: {e}")))?;

        debug!(status = status.as_u16(), "downstream response");

        if status == expected {
            return Ok(body.to_vec());
        }
        Err(classify(status, &body))
    }
}

/// Maps a non-success response onto the error taxonomy.
pub fn classify(status: StatusCode, body: &[u8]) -> ServiceError {
    match status {
        StatusCode::BAD_REQUEST => {
            let ErrorBody { message, errors } = ErrorBody::parse(body);
            ServiceError::Validation { message, errors }
        }
        StatusCode::FORBIDDEN => ServiceError::Forbidden {
            message: ErrorBody::parse(body).message,
        },
        StatusCode::NOT_FOUND | StatusCode::CONFLICT | StatusCode::INTERNAL_SERVER_ERROR => {
            ServiceError::Internal {
                status: status.as_u16(),
                message: ErrorBody::parse(body).message,
            }
        }
        other => ServiceError::UnknownStatus {
            status: other.as_u16(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bad_request() {
        let err = classify(
            StatusCode::BAD_REQUEST,
            br#"{"message":"bad","errors":[{"field":"dateTo","error":"required"}]}"#,
        );
        assert!(err.is_caller_fault());
        assert!(
            matches!(err, ServiceError::Validation { ref errors, .. } if errors[0].field == "dateTo")
        );
    }

    #[test]
    fn test_classify_definitive_failures_keep_status() {
        for status in [
            StatusCode::NOT_FOUND,
            StatusCode::CONFLICT,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let err = classify(status, br#"{"message":"nope"}"#);
            assert_eq!(err, ServiceError::internal(status.as_u16(), "nope"));
        }
    }

    #[test]
    fn test_classify_forbidden() {
        let err = classify(StatusCode::FORBIDDEN, br#"{"message":"not yours"}"#);
        assert!(matches!(err, ServiceError::Forbidden { ref message } if message == "not yours"));
    }

    #[test]
    fn test_classify_unexpected_status() {
        let err = classify(StatusCode::BAD_GATEWAY, b"");
        assert_eq!(err, ServiceError::UnknownStatus { status: 502 });
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let transport = HttpTransport::new(reqwest::Client::new(), "http://cars:8070/", "secret");
        assert_eq!(transport.base_url, "http://cars:8070");
    }
}
