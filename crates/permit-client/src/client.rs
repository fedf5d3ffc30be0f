//! HTTP client for the check endpoint.

use std::collections::BTreeMap;
use std::time::Duration;

use permit_core::{Permit, KEY_LENGTH};
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};

/// Request timeout used by [`Client::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What a client presents to the server.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRequest {
    pub key: String,
    pub domain: String,
    /// Attributes the caller believes it holds. The server logs them only.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, i64>,
}

impl CheckRequest {
    pub fn new(key: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            domain: domain.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, value: i64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for one permit server.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// A client for the server at `base_url`, e.g. `https://permits.example.com`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_http(http, base_url))
    }

    /// A client reusing an existing `reqwest::Client`.
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server whether `request.key` is a valid permit for `request.domain`.
    ///
    /// Keys of the wrong length fail before any request is sent. A 200 answer
    /// is checked again locally: it must be for the requested key and domain
    /// and must still be valid.
    pub async fn check(&self, request: &CheckRequest) -> Result<Permit> {
        let len = request.key.chars().count();
        if len != KEY_LENGTH {
            return Err(ClientError::InvalidKeyLength {
                len,
                expected: KEY_LENGTH,
            });
        }

        let url = format!("{}/check", self.base_url);
        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), domain = %request.domain, "permit check answered");

        if status != StatusCode::OK {
            return Err(error_for(response).await);
        }

        let permit: Permit = response.json().await?;
        if permit.key != request.key {
            return Err(ClientError::InvalidPermit("key mismatch"));
        }
        if permit.domain != request.domain {
            return Err(ClientError::InvalidPermit("domain mismatch"));
        }
        if !permit.is_valid() {
            return Err(ClientError::InvalidPermit("permit not valid"));
        }
        Ok(permit)
    }
}

async fn error_for(response: Response) -> ClientError {
    let status = response.status();
    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());

    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(&body).trim().to_string());

    match status {
        StatusCode::BAD_REQUEST => ClientError::BadRequest(message),
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
        StatusCode::NOT_FOUND => ClientError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited { retry_after_secs },
        s if s.is_server_error() => ClientError::Server {
            status: s.as_u16(),
            message,
        },
        s => ClientError::UnexpectedStatus {
            status: s.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_attributes_are_omitted() {
        let json = serde_json::to_value(CheckRequest::new("k", "example.com")).unwrap();
        assert!(json.get("attributes").is_none());

        let json =
            serde_json::to_value(CheckRequest::new("k", "example.com").attribute("system.max-users", 5))
                .unwrap();
        assert_eq!(json["attributes"]["system.max-users"], 5);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = Client::with_http(reqwest::Client::new(), "http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_transient_errors() {
        assert!(ClientError::RateLimited { retry_after_secs: None }.is_transient());
        assert!(!ClientError::NotFound.is_transient());
        assert!(!ClientError::Unauthorized("domain mismatch".into()).is_transient());
    }
}
