//! Per-address mutual exclusion.
//!
//! Writers to the same storage address queue on one async mutex; writers to
//! different addresses never contend. Entries are dropped from the table as
//! soon as nobody holds or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use permit_core::StorageAddress;
use tokio::sync::OwnedMutexGuard;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// Table of per-address locks.
#[derive(Default)]
pub(crate) struct AddressLocks {
    slots: Mutex<HashMap<StorageAddress, Slot>>,
}

impl AddressLocks {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait for exclusive access to `address`.
    ///
    /// The guard is `'static` so it can be moved into a blocking task and
    /// released only when that task finishes, even if the caller gave up.
    pub(crate) async fn lock(self: &Arc<Self>, address: StorageAddress) -> AddressGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(address).or_default().clone()
        };
        let guard = slot.lock_owned().await;
        AddressGuard {
            table: Arc::clone(self),
            address,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive access to one address. Released on drop.
pub(crate) struct AddressGuard {
    table: Arc<AddressLocks>,
    address: StorageAddress,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AddressGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut slots = self
            .table
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the table's own reference left: no holder, no waiter.
        if slots
            .get(&self.address)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.address);
        }
    }
}
