//! # Permit
//!
//! Software license permits: opaque keyed tokens that bind a feature
//! attribute set to a customer domain, with optional expiry and an explicit
//! enable/disable flag.
//!
//! ## Overview
//!
//! - Operators issue, inspect, revoke and extend permits through the
//!   [`Registry`] (the `permit` binary is a thin CLI over it).
//! - Third-party software confirms its permit against the HTTP service
//!   ([`api`]) using the [`client`] library.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use permit::core::{IssueRequest, PermitKind};
//! use permit::store::FsStore;
//! use permit::Registry;
//!
//! async fn example() {
//!     let registry = Registry::new(Arc::new(FsStore::open("./permits").unwrap()));
//!
//!     let issued = registry
//!         .create(IssueRequest::new("example.com").kind(PermitKind::Trial))
//!         .await
//!         .unwrap();
//!
//!     registry.revoke(&issued.permit.key).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `permit::core` - Permit, validation, attributes, issuance policy
//! - `permit::store` - The Keeper trait and its backends
//! - `permit::api` - HTTP router and handlers
//! - `permit::client` - Client for the check endpoint

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod render;

// Re-export component crates
pub use permit_api as api;
pub use permit_client as client;
pub use permit_core as core;
pub use permit_store as store;

// Re-export main types for convenience
pub use error::{RegistryError, Result};
pub use registry::Registry;

// Re-export commonly used core types
pub use permit_core::{Attributes, IssueRequest, Permit, PermitKind, StorageAddress};
