//! Keeper trait: the abstract interface for permit persistence.
//!
//! The CLI and the HTTP handlers only ever talk to a `dyn Keeper`.
//! Implementations include the filesystem (primary), SQLite and in-memory
//! (for tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use permit_core::{Mutation, Permit};

use crate::error::Result;

/// Filter for [`Keeper::list`].
///
/// An empty query matches everything. Otherwise a permit matches when its
/// key starts with the query, or its domain contains the query ignoring
/// ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    query: String,
}

impl ListQuery {
    /// Match every permit.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into().trim().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// The trimmed query text.
    pub fn as_str(&self) -> &str {
        &self.query
    }

    pub fn matches(&self, permit: &Permit) -> bool {
        if self.query.is_empty() {
            return true;
        }
        permit.key.starts_with(&self.query)
            || permit
                .domain
                .to_ascii_lowercase()
                .contains(&self.query.to_ascii_lowercase())
    }

    /// Keep matching permits and put them in listing order.
    pub(crate) fn apply(&self, permits: impl IntoIterator<Item = Permit>) -> Vec<Permit> {
        let mut matched: Vec<Permit> = permits.into_iter().filter(|p| self.matches(p)).collect();
        sort_for_listing(&mut matched);
        matched
    }
}

impl From<&str> for ListQuery {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<Option<String>> for ListQuery {
    fn from(query: Option<String>) -> Self {
        query.map(Self::new).unwrap_or_default()
    }
}

/// Listing order: oldest first, then by domain.
pub(crate) fn sort_for_listing(permits: &mut [Permit]) {
    permits.sort_by(|a, b| {
        a.issued
            .cmp(&b.issued)
            .then_with(|| a.domain.cmp(&b.domain))
            .then_with(|| a.address().cmp(&b.address()))
    });
}

/// The Keeper trait: async interface for permit persistence.
///
/// Every record is addressed by [`permit_core::StorageAddress::derive`] of
/// its key and always read and written whole.
///
/// # Concurrency
///
/// Implementations must make `create` atomic with respect to other creates
/// at the same address (exactly one wins, the rest see `AlreadyExists`), and
/// must serialize `update` per address so that concurrent read-modify-write
/// calls never lose a mutation. Operations on different addresses do not
/// contend.
#[async_trait]
pub trait Keeper: Send + Sync {
    /// Return every stored permit matching `query`.
    async fn list(&self, query: &ListQuery) -> Result<Vec<Permit>>;

    /// Look a permit up by key. `NotFound` if absent.
    async fn get(&self, key: &str) -> Result<Permit>;

    /// Persist a new permit. `AlreadyExists` if its address is taken.
    async fn create(&self, permit: &Permit) -> Result<()>;

    /// Read-modify-write one field of a stored permit. `NotFound` if absent.
    async fn update(&self, key: &str, mutation: Mutation) -> Result<()>;

    /// Remove a permit. `NotFound` if absent.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Set `valid` to false.
    async fn revoke(&self, key: &str) -> Result<()> {
        self.update(key, Mutation::Revoke).await
    }

    /// Set `valid` to true.
    async fn enable(&self, key: &str) -> Result<()> {
        self.update(key, Mutation::Enable).await
    }

    /// Replace `expires`. `None` removes the expiry.
    async fn extend(&self, key: &str, expires: Option<DateTime<Utc>>) -> Result<()> {
        self.update(key, Mutation::Extend(expires)).await
    }
}
