//! Error types for permit core.

use thiserror::Error;

/// Errors raised while validating input or issuing a permit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermitError {
    #[error("invalid domain")]
    InvalidDomain,

    #[error("domain length {len} outside of {min}..={max}")]
    DomainLength { len: usize, min: usize, max: usize },

    #[error("key length {len} outside of {min}..={max}")]
    KeyLength { len: usize, min: usize, max: usize },

    #[error("invalid value {value} for attribute {name}: must be -1, 0 or a positive cap")]
    InvalidAttribute { name: String, value: i64 },

    #[error("invalid storage address: {0}")]
    InvalidAddress(String),

    #[error("invalid expiry: {0}")]
    InvalidExpiry(String),
}

/// Result type for permit core operations.
pub type Result<T> = std::result::Result<T, PermitError>;
