//! In-memory implementation of the Keeper trait.
//!
//! This is primarily for testing. It has the same semantics as the
//! filesystem store but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use permit_core::{Mutation, Permit, StorageAddress};

use crate::error::{Result, StoreError};
use crate::traits::{Keeper, ListQuery};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Every operation runs under a
/// single RwLock, which makes create-if-absent and read-modify-write atomic.
#[derive(Default)]
pub struct MemoryStore {
    permits: RwLock<HashMap<StorageAddress, Permit>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored permits.
    pub fn len(&self) -> usize {
        self.permits.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Keeper for MemoryStore {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Permit>> {
        let permits = self.permits.read().unwrap_or_else(PoisonError::into_inner);
        Ok(query.apply(permits.values().cloned()))
    }

    async fn get(&self, key: &str) -> Result<Permit> {
        let address = StorageAddress::derive(key);
        let permits = self.permits.read().unwrap_or_else(PoisonError::into_inner);
        permits
            .get(&address)
            .cloned()
            .ok_or(StoreError::NotFound { address })
    }

    async fn create(&self, permit: &Permit) -> Result<()> {
        let address = permit.address();
        let mut permits = self.permits.write().unwrap_or_else(PoisonError::into_inner);

        if permits.contains_key(&address) {
            return Err(StoreError::AlreadyExists { address });
        }
        permits.insert(address, permit.clone());
        Ok(())
    }

    async fn update(&self, key: &str, mutation: Mutation) -> Result<()> {
        let address = StorageAddress::derive(key);
        let mut permits = self.permits.write().unwrap_or_else(PoisonError::into_inner);

        let permit = permits
            .get_mut(&address)
            .ok_or(StoreError::NotFound { address })?;
        permit.apply(&mutation);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let address = StorageAddress::derive(key);
        let mut permits = self.permits.write().unwrap_or_else(PoisonError::into_inner);

        permits
            .remove(&address)
            .map(|_| ())
            .ok_or(StoreError::NotFound { address })
    }
}
