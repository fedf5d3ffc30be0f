//! Permit attributes: namespaced feature flags and quotas.
//!
//! Attribute names have the form `<subsystem>.<feature>`. Values follow one
//! convention everywhere: `-1` is unlimited, `0` is disabled and any positive
//! number is a hard cap.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PermitError, Result};

/// The canonical attribute set and its defaults.
///
/// Every permit minted through the issuance path carries exactly these keys.
pub const DEFAULT_ATTRIBUTES: [(&str, i64); 16] = [
    ("system.enabled", 1),
    ("system.max-users", -1),
    ("system.max-organisations", 1),
    ("system.max-teams", -1),
    ("messaging.enabled", 1),
    ("messaging.max-users", -1),
    ("messaging.max-private-channels", -1),
    ("messaging.max-public-channels", -1),
    ("messaging.max-messages", -1),
    ("compose.enabled", 1),
    ("compose.max-namespaces", -1),
    ("compose.max-users", -1),
    ("compose.max-modules", -1),
    ("compose.max-charts", -1),
    ("compose.max-pages", -1),
    ("compose.max-triggers", -1),
];

/// Check whether `name` belongs to the canonical attribute set.
pub fn is_known_attribute(name: &str) -> bool {
    DEFAULT_ATTRIBUTES.iter().any(|(known, _)| *known == name)
}

/// Decoded meaning of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// `-1`: no limit.
    Unlimited,
    /// `0`: feature switched off.
    Disabled,
    /// `n > 0`: at most `n`.
    Capped(u64),
}

impl Limit {
    /// Decode a raw attribute value. Values below `-1` have no meaning.
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Self::Unlimited),
            0 => Some(Self::Disabled),
            n if n > 0 => Some(Self::Capped(n as u64)),
            _ => None,
        }
    }

    /// Check whether `used` units still fit under this limit.
    pub fn allows(&self, used: u64) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Disabled => false,
            Self::Capped(cap) => used < *cap,
        }
    }
}

/// Outcome of merging caller overrides onto the default set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedAttributes {
    /// The complete attribute set.
    pub attributes: Attributes,
    /// Caller supplied names that are not part of the canonical set.
    pub dropped: Vec<String>,
}

/// The attribute map carried by a permit.
///
/// Ordered so that serialized records and printed output are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, i64>);

impl Attributes {
    /// An empty attribute map.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// A full copy of the canonical default set.
    pub fn defaults() -> Self {
        Self(
            DEFAULT_ATTRIBUTES
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        )
    }

    /// Merge caller overrides onto the canonical default set.
    ///
    /// Only names already in the default set take an override. Unknown names
    /// are dropped and reported; default names missing from `overrides` keep
    /// their default. Values below `-1` are rejected.
    pub fn merged_with_defaults(overrides: &BTreeMap<String, i64>) -> Result<MergedAttributes> {
        let mut attributes = Self::defaults();
        let mut dropped = Vec::new();

        for (name, value) in overrides {
            if !is_known_attribute(name) {
                dropped.push(name.clone());
                continue;
            }
            if Limit::from_value(*value).is_none() {
                return Err(PermitError::InvalidAttribute {
                    name: name.clone(),
                    value: *value,
                });
            }
            attributes.0.insert(name.clone(), *value);
        }

        Ok(MergedAttributes {
            attributes,
            dropped,
        })
    }

    /// Raw value of an attribute.
    pub fn get(&self, name: &str) -> Option<i64> {
        self.0.get(name).copied()
    }

    /// Decoded limit of an attribute.
    pub fn limit(&self, name: &str) -> Option<Limit> {
        self.get(name).and_then(Limit::from_value)
    }

    /// Set an attribute value directly.
    pub fn insert(&mut self, name: impl Into<String>, value: i64) -> Option<i64> {
        self.0.insert(name.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl From<BTreeMap<String, i64>> for Attributes {
    fn from(map: BTreeMap<String, i64>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, i64)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
