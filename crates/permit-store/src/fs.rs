//! Filesystem implementation of the Keeper trait.
//!
//! This is the primary storage backend. One JSON file per permit, named by
//! the hex [`StorageAddress`] of its key, inside an operator-configured
//! directory.
//!
//! Writes never touch the target file directly: the record is written to a
//! temp file in the same directory, synced, then published atomically. A new
//! record is published with a no-clobber link, so two creates at the same
//! address cannot both succeed. A replaced record is published with a rename.
//! An interrupted write leaves at most a stray temp file, never a partial
//! record.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use permit_core::{Mutation, Permit, StorageAddress};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::locks::AddressLocks;
use crate::traits::{Keeper, ListQuery};

/// Filesystem-backed permit store.
///
/// Per-address locking serializes every mutation of one record; reads take
/// no lock since published files are always complete.
#[derive(Clone)]
pub struct FsStore {
    root: PathBuf,
    locks: Arc<AddressLocks>,
}

/// How a finished temp file replaces the target.
#[derive(Clone, Copy)]
enum Publish {
    /// Fail with `AlreadyExists` if the target exists.
    NoClobber,
    /// Atomically replace the target.
    Replace,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| StoreError::io("open", root.display(), e))?;
        Ok(Self {
            root,
            locks: AddressLocks::new(),
        })
    }

    /// The directory records live in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file a permit key is stored in.
    pub fn path_for(&self, key: &str) -> PathBuf {
        record_path(&self.root, &StorageAddress::derive(key))
    }
}

fn record_path(root: &Path, address: &StorageAddress) -> PathBuf {
    root.join(address.to_hex())
}

fn read_record(root: &Path, address: StorageAddress) -> Result<Permit> {
    let bytes = match fs::read(record_path(root, &address)) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::NotFound { address });
        }
        Err(e) => return Err(StoreError::io("read", address, e)),
    };

    let permit: Permit =
        serde_json::from_slice(&bytes).map_err(|e| StoreError::serialization("decode", address, e))?;

    if !address.matches(&permit.key) {
        return Err(StoreError::InvalidData(format!(
            "record {address} holds a permit for a different key"
        )));
    }

    Ok(permit)
}

fn write_record(root: &Path, address: StorageAddress, permit: &Permit, publish: Publish) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(root).map_err(|e| StoreError::io("create", address, e))?;

    serde_json::to_writer_pretty(&mut tmp, permit)
        .map_err(|e| StoreError::serialization("encode", address, e))?;
    tmp.write_all(b"\n")
        .map_err(|e| StoreError::io("write", address, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io("sync", address, e))?;

    let target = record_path(root, &address);
    match publish {
        Publish::NoClobber => tmp.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                StoreError::AlreadyExists { address }
            } else {
                StoreError::io("publish", address, e.error)
            }
        })?,
        Publish::Replace => tmp
            .persist(&target)
            .map_err(|e| StoreError::io("publish", address, e.error))?,
    };

    Ok(())
}

#[async_trait]
impl Keeper for FsStore {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Permit>> {
        let root = self.root.clone();

        let permits = tokio::task::spawn_blocking(move || -> Result<Vec<Permit>> {
            let entries = fs::read_dir(&root).map_err(|e| StoreError::io("list", root.display(), e))?;

            let mut permits = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| StoreError::io("list", root.display(), e))?;
                let name = entry.file_name();
                // In-flight temp files and anything else foreign to the store.
                let Some(address) = name.to_str().and_then(|n| n.parse::<StorageAddress>().ok())
                else {
                    continue;
                };

                match read_record(&root, address) {
                    Ok(permit) => permits.push(permit),
                    // Deleted between read_dir and read.
                    Err(StoreError::NotFound { .. }) => continue,
                    Err(e) => return Err(e),
                }
            }
            Ok(permits)
        })
        .await
        .map_err(StoreError::task("list"))??;

        Ok(query.apply(permits))
    }

    async fn get(&self, key: &str) -> Result<Permit> {
        let root = self.root.clone();
        let address = StorageAddress::derive(key);

        tokio::task::spawn_blocking(move || read_record(&root, address))
            .await
            .map_err(StoreError::task("get"))?
    }

    async fn create(&self, permit: &Permit) -> Result<()> {
        let root = self.root.clone();
        let address = permit.address();
        let permit = permit.clone();
        let guard = self.locks.lock(address).await;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let _guard = guard;
            write_record(&root, address, &permit, Publish::NoClobber)?;
            debug!(%address, "permit created");
            Ok(())
        })
        .await
        .map_err(StoreError::task("create"))?
    }

    async fn update(&self, key: &str, mutation: Mutation) -> Result<()> {
        let root = self.root.clone();
        let address = StorageAddress::derive(key);
        let guard = self.locks.lock(address).await;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let _guard = guard;
            let mut permit = read_record(&root, address)?;
            permit.apply(&mutation);
            write_record(&root, address, &permit, Publish::Replace)?;
            debug!(%address, op = mutation.name(), "permit updated");
            Ok(())
        })
        .await
        .map_err(StoreError::task(mutation.name()))?
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let root = self.root.clone();
        let address = StorageAddress::derive(key);
        let guard = self.locks.lock(address).await;

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            match fs::remove_file(record_path(&root, &address)) {
                Ok(()) => {
                    debug!(%address, "permit deleted");
                    Ok(())
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound { address }),
                Err(e) => Err(StoreError::io("remove", address, e)),
            }
        })
        .await
        .map_err(StoreError::task("delete"))?
    }
}
