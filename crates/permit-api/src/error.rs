//! Error responses for the HTTP service.
//!
//! Every failure leaves the service as a JSON body `{"error": "<message>"}`
//! with a status code chosen by the variant.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by handlers and middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body could not be decoded.
    #[error("could not decode request: {0}")]
    Decode(String),

    /// Request decoded but carries out-of-bounds or malformed values.
    #[error("{0}")]
    Validation(String),

    /// Missing or bad credentials, domain mismatch, or a permit that is not valid.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// No permit for the presented key.
    #[error("permit not found")]
    NotFound,

    /// Per-client quota exhausted.
    #[error("too many requests")]
    RateLimited { retry_after_secs: u64 },

    /// Storage failure. The detail is logged, not returned.
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<permit_core::PermitError> for ApiError {
    fn from(e: permit_core::PermitError) -> Self {
        Self::Validation(e.to_string())
    }
}

/// Wire shape of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorBody {
            error: self.to_string(),
        });

        match self {
            Self::RateLimited { retry_after_secs } => {
                (status, [(header::RETRY_AFTER, retry_after_secs.to_string())], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Decode("eof".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Unauthorized("domain mismatch").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::RateLimited { retry_after_secs: 1 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Internal("could not fetch permit").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn test_messages() {
        assert_eq!(ApiError::NotFound.to_string(), "permit not found");
        assert_eq!(
            ApiError::Decode("EOF while parsing".into()).to_string(),
            "could not decode request: EOF while parsing"
        );
    }
}
