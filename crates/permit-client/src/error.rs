//! Error types for the client.

use thiserror::Error;

/// Errors returned by [`crate::Client::check`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Key rejected locally; no request was sent.
    #[error("invalid key length {len}, expected {expected}")]
    InvalidKeyLength { len: usize, expected: usize },

    /// The server rejected the request as malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Domain mismatch, or the permit is revoked or expired.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The server has no permit for the key.
    #[error("permit not found")]
    NotFound,

    /// Too many checks from this client.
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The server failed.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// A status the protocol does not define.
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// The server answered 200 with a permit that does not pass local checks.
    #[error("server returned an unusable permit: {0}")]
    InvalidPermit(&'static str),

    /// Transport or decode failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// True when a later retry could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Http(_)
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
