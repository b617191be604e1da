//! Bearer token extraction.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use downstream::Credentials;

use crate::error::ApiError;

/// The caller's bearer token. Not verified here; it is forwarded verbatim
/// to the downstream services, which own authorization.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn credentials(&self) -> Credentials {
        Credentials::Bearer(self.0.clone())
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;

        let value = header
            .to_str()
            .map_err(|_| ApiError::Unauthorized("malformed authorization header".to_string()))?;

        match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(BearerToken(token.trim().to_string())),
            _ => Err(ApiError::Unauthorized(
                "authorization header is not a bearer token".to_string(),
            )),
        }
    }
}
