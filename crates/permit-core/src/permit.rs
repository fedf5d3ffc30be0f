//! Permit: a license record binding a key to a customer domain.
//!
//! After creation a permit only changes through a [`Mutation`]: revoke,
//! enable or extend. Every mutation is a full overwrite of the stored record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;
use crate::types::StorageAddress;
use crate::validation::validate_domain;

/// The current permit schema version.
pub const PERMIT_VERSION: u32 = 1;

/// Length of a generated permit key.
pub const KEY_LENGTH: usize = 64;

/// A license record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit {
    /// Schema version tag.
    pub version: u32,
    /// Bearer secret identifying the permit; unique within a store.
    pub key: String,
    /// Customer domain the permit is scoped to.
    pub domain: String,
    /// Absent means the permit never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Administrative on/off switch, independent of expiry.
    pub valid: bool,
    /// Feature flags and quotas.
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub entity: String,
    /// Creation time. Set once.
    pub issued: DateTime<Utc>,
}

impl Permit {
    /// The address this permit is stored under.
    pub fn address(&self) -> StorageAddress {
        StorageAddress::derive(&self.key)
    }

    /// True iff the permit has an expiry strictly before `now`.
    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires < now)
    }

    /// [`Permit::expired_at`] against the current time.
    pub fn expired(&self) -> bool {
        self.expired_at(Utc::now())
    }

    /// `valid && !expired && domain matches the pattern`, evaluated at `now`.
    ///
    /// Short-circuits in that order. Every term is pure, so the order only
    /// matters for cost.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid && !self.expired_at(now) && validate_domain(&self.domain)
    }

    /// [`Permit::is_valid_at`] against the current time.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Apply a single-field mutation in place.
    pub fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Revoke => self.valid = false,
            Mutation::Enable => self.valid = true,
            Mutation::Extend(expires) => self.expires = *expires,
        }
    }
}

/// The in-place changes a stored permit accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Set `valid` to false.
    Revoke,
    /// Set `valid` to true.
    Enable,
    /// Replace `expires`. `None` removes the expiry.
    Extend(Option<DateTime<Utc>>),
}

impl Mutation {
    /// Operation name used in logs and error context.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Revoke => "revoke",
            Self::Enable => "enable",
            Self::Extend(_) => "extend",
        }
    }
}
