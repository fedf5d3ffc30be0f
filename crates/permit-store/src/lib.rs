//! # Permit Store
//!
//! Storage abstraction for permits. Provides a trait-based interface for
//! permit persistence with filesystem, SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! Every record lives at the [`permit_core::StorageAddress`] derived from its
//! key, so nothing on disk names the secret itself. The CLI and the HTTP
//! service only see the [`Keeper`] trait.
//!
//! ## Key Types
//!
//! - [`Keeper`] - The async trait for all storage operations
//! - [`FsStore`] - One JSON file per permit, published atomically
//! - [`SqliteStore`] - Single-file SQLite storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`ListQuery`] - Filter for listing
//!
//! ## Usage
//!
//! ```rust,no_run
//! use permit_store::{FsStore, Keeper, ListQuery};
//!
//! async fn example() {
//!     let store = FsStore::open("./permits").unwrap();
//!
//!     for permit in store.list(&ListQuery::new("example.com")).await.unwrap() {
//!         println!("{} {}", permit.domain, permit.valid);
//!     }
//!
//!     store.revoke("some-permit-key").await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Create never overwrites**: a second create at a taken address returns `AlreadyExists`
//! - **No lost updates**: mutations of one record are serialized per address
//! - **No torn records**: readers only ever see a complete record or none

pub mod error;
pub mod fs;
mod locks;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Keeper, ListQuery};
