//! Strong type definitions for permits.
//!
//! Identifiers are newtypes to prevent mixing a permit key with the
//! address it is stored under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PermitError;

/// A 32-byte storage address, computed as Blake3(key).
///
/// The store never names a record by its key: the key is a bearer secret,
/// the address is a one-way digest of it and is safe to use as a file name
/// or to print in logs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageAddress(pub [u8; 32]);

impl StorageAddress {
    /// Derive the address for a permit key.
    pub fn derive(key: &str) -> Self {
        Self(*blake3::hash(key.as_bytes()).as_bytes())
    }

    /// Create a new address from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string (64 lowercase characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Check whether `key` hashes to this address.
    pub fn matches(&self, key: &str) -> bool {
        Self::derive(key) == *self
    }
}

impl fmt::Debug for StorageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageAddress({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for StorageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl FromStr for StorageAddress {
    type Err = PermitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Uppercase hex would decode to the same bytes but name a different file.
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(PermitError::InvalidAddress(s.to_string()));
        }
        Self::from_hex(s).map_err(|_| PermitError::InvalidAddress(s.to_string()))
    }
}

impl AsRef<[u8]> for StorageAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for StorageAddress {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
