//! # Permit Testkit
//!
//! Testing utilities for the permit crates.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: stores pre-filled with permits, a running HTTP server, signed bearer tokens
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use permit_testkit::generators::{permit_from_params, PermitParams};
//!
//! proptest! {
//!     #[test]
//!     fn address_is_stable(params: PermitParams) {
//!         let permit = permit_from_params(&params);
//!         prop_assert_eq!(permit.address(), permit.address());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use permit_testkit::fixtures::{expired_permit, make_permit};
//!
//! let permit = make_permit("example.com");
//! assert!(permit.is_valid());
//! assert!(!expired_permit("example.com").is_valid());
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    bearer_token, expired_permit, make_permit, spawn_server, temp_fs_store, TestFixture, TestServer,
};
pub use generators::{permit_from_params, PermitParams};
