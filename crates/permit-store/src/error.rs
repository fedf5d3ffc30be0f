//! Error types for the store module.
//!
//! Errors name the storage address, never the permit key, so they can be
//! logged and returned without leaking the secret.

use permit_core::StorageAddress;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record at the derived address.
    #[error("permit not found: {address}")]
    NotFound { address: StorageAddress },

    /// A record already exists at the derived address.
    #[error("permit already exists: {address}")]
    AlreadyExists { address: StorageAddress },

    /// Filesystem failure.
    #[error("could not {op} permit {address}: {source}")]
    Io {
        op: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded or decoded.
    #[error("could not {op} permit {address}: {source}")]
    Serialization {
        op: &'static str,
        address: String,
        #[source]
        source: serde_json::Error,
    },

    /// Database error from SQLite.
    #[error("database error during {op}: {source}")]
    Database {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A record decoded but does not belong where it was found.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Blocking task was cancelled or panicked.
    #[error("storage task failed during {op}: {message}")]
    Task { op: &'static str, message: String },
}

impl StoreError {
    /// True for "never existed", as opposed to "something is broken".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when a create collided with an existing record.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub(crate) fn io(op: &'static str, address: impl ToString, source: std::io::Error) -> Self {
        Self::Io {
            op,
            address: address.to_string(),
            source,
        }
    }

    pub(crate) fn serialization(
        op: &'static str,
        address: impl ToString,
        source: serde_json::Error,
    ) -> Self {
        Self::Serialization {
            op,
            address: address.to_string(),
            source,
        }
    }

    pub(crate) fn database(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Database { op, source }
    }

    pub(crate) fn task(op: &'static str) -> impl FnOnce(tokio::task::JoinError) -> Self {
        move |e| Self::Task {
            op,
            message: e.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
