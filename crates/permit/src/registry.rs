//! The Registry: operator-facing API over a permit store.
//!
//! Every command of the `permit` binary is one Registry call. The Registry
//! adds the issuance policy and logging on top of a [`Keeper`]; it never
//! retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use permit_core::{expiry_after_months, issue, IssueRequest, Issued, Permit};
use permit_store::{Keeper, ListQuery};
use tracing::{info, warn};

use crate::error::Result;

/// Operator actions on one store.
#[derive(Clone)]
pub struct Registry {
    keeper: Arc<dyn Keeper>,
}

impl Registry {
    pub fn new(keeper: Arc<dyn Keeper>) -> Self {
        Self { keeper }
    }

    /// The underlying store.
    pub fn keeper(&self) -> Arc<dyn Keeper> {
        Arc::clone(&self.keeper)
    }

    /// Permits matching `query`, oldest first.
    pub async fn list(&self, query: impl Into<ListQuery>) -> Result<Vec<Permit>> {
        Ok(self.keeper.list(&query.into()).await?)
    }

    pub async fn get(&self, key: &str) -> Result<Permit> {
        Ok(self.keeper.get(key).await?)
    }

    /// Mint a permit and store it.
    ///
    /// A forced key that is already taken fails with `AlreadyExists` and
    /// leaves the existing permit untouched.
    pub async fn create(&self, request: IssueRequest) -> Result<Issued> {
        let issued = issue(request, Utc::now())?;
        if !issued.dropped_attributes.is_empty() {
            warn!(dropped = ?issued.dropped_attributes, "ignoring unknown attributes");
        }

        self.keeper.create(&issued.permit).await?;
        info!(
            address = %issued.permit.address(),
            domain = %issued.permit.domain,
            expires = ?issued.permit.expires,
            "permit created"
        );
        Ok(issued)
    }

    pub async fn revoke(&self, key: &str) -> Result<()> {
        self.keeper.revoke(key).await?;
        info!(address = %permit_core::StorageAddress::derive(key), "permit revoked");
        Ok(())
    }

    pub async fn enable(&self, key: &str) -> Result<()> {
        self.keeper.enable(key).await?;
        info!(address = %permit_core::StorageAddress::derive(key), "permit enabled");
        Ok(())
    }

    /// Set the expiry to `months` calendar months from now. Returns the new expiry.
    pub async fn extend_months(&self, key: &str, months: u32) -> Result<DateTime<Utc>> {
        let expires = expiry_after_months(Utc::now(), months)?;
        self.keeper.extend(key, Some(expires)).await?;
        info!(address = %permit_core::StorageAddress::derive(key), %expires, "permit extended");
        Ok(expires)
    }

    /// Remove the expiry.
    pub async fn extend_infinite(&self, key: &str) -> Result<()> {
        self.keeper.extend(key, None).await?;
        info!(address = %permit_core::StorageAddress::derive(key), "permit no longer expires");
        Ok(())
    }

    /// Delete every key in order, stopping at the first failure.
    pub async fn delete<S: AsRef<str>>(&self, keys: &[S]) -> Result<()> {
        for key in keys {
            let key = key.as_ref();
            self.keeper.delete(key).await?;
            info!(address = %permit_core::StorageAddress::derive(key), "permit deleted");
        }
        Ok(())
    }
}
