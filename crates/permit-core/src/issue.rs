//! Issuance policy: how a new permit is minted.
//!
//! Shared by the operator CLI and the create endpoint so that both offer
//! the same permit kinds and compute expiry the same way.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Months, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;
use crate::crypto::generate_key;
use crate::error::{PermitError, Result};
use crate::permit::{Permit, PERMIT_VERSION};
use crate::validation::{check_key_bounds, ensure_domain};

/// Length of a trial, counted from the next day boundary.
pub const TRIAL_DAYS: i64 = 14;

/// Length of a standard permit, counted from the next day boundary.
pub const STANDARD_MONTHS: u32 = 12;

/// What kind of permit to issue. Decides the expiry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitKind {
    /// One year from the next day boundary.
    #[default]
    Standard,
    /// Fourteen days from the next day boundary.
    Trial,
    /// Never expires.
    Infinite,
}

/// Compute the expiry for a new permit of `kind` issued at `now`.
///
/// `now` is truncated to its UTC day and moved to the next midnight before
/// the kind's duration is added.
pub fn expiry_for(kind: PermitKind, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    let tomorrow = now
        .date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| PermitError::InvalidExpiry(format!("no day after {now}")))?;

    let expires = match kind {
        PermitKind::Infinite => return Ok(None),
        PermitKind::Trial => tomorrow.checked_add_signed(Duration::days(TRIAL_DAYS)),
        PermitKind::Standard => tomorrow.checked_add_months(Months::new(STANDARD_MONTHS)),
    };

    expires
        .map(Some)
        .ok_or_else(|| PermitError::InvalidExpiry(format!("{kind:?} permit from {now}")))
}

/// `now` plus a number of calendar months. Used to extend existing permits.
pub fn expiry_after_months(now: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>> {
    if months == 0 {
        return Err(PermitError::InvalidExpiry("extension must be at least one month".into()));
    }
    now.checked_add_months(Months::new(months))
        .ok_or_else(|| PermitError::InvalidExpiry(format!("{months} months from {now}")))
}

/// Everything needed to mint a permit.
#[derive(Debug, Clone, Default)]
pub struct IssueRequest {
    pub domain: String,
    /// Overrides for the default attribute set.
    pub attributes: BTreeMap<String, i64>,
    pub contact: String,
    pub entity: String,
    pub kind: PermitKind,
    /// Use this key instead of generating one.
    pub key: Option<String>,
}

impl IssueRequest {
    /// A request for `domain` with default attributes and a standard expiry.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: PermitKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = contact.into();
        self
    }

    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = entity.into();
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: i64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }
}

/// A freshly minted permit, not yet persisted.
#[derive(Debug, Clone)]
pub struct Issued {
    pub permit: Permit,
    /// Requested attribute names that were not part of the canonical set.
    pub dropped_attributes: Vec<String>,
}

/// Mint a permit from `request` at time `now`.
///
/// Checks the domain first, then computes expiry, picks the key and merges
/// attributes. Nothing is persisted.
pub fn issue(request: IssueRequest, now: DateTime<Utc>) -> Result<Issued> {
    ensure_domain(&request.domain)?;

    let expires = expiry_for(request.kind, now)?;

    let key = match request.key {
        Some(key) => {
            check_key_bounds(&key)?;
            key
        }
        None => generate_key(),
    };

    let merged = Attributes::merged_with_defaults(&request.attributes)?;

    let permit = Permit {
        version: PERMIT_VERSION,
        key,
        domain: request.domain,
        expires,
        valid: true,
        attributes: merged.attributes,
        contact: request.contact,
        entity: request.entity,
        issued: now.trunc_subsecs(0),
    };

    Ok(Issued {
        permit,
        dropped_attributes: merged.dropped,
    })
}
