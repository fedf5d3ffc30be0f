//! # Permit Core
//!
//! Pure primitives for software license permits: the permit record, its
//! validity predicate, the attribute set and the issuance policy.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Permit`] - A license record binding a key to a customer domain
//! - [`StorageAddress`] - One-way digest of a permit key, used to name records
//! - [`Attributes`] - Namespaced feature flags and quotas
//! - [`Mutation`] - The in-place changes a stored permit accepts
//! - [`IssueRequest`] - Input to [`issue`], the minting policy
//!
//! ## Validity
//!
//! A permit is valid when its `valid` flag is set, it has not expired and its
//! domain matches the domain pattern. All three are re-evaluated on every
//! call; nothing is cached.

pub mod attributes;
pub mod crypto;
pub mod error;
pub mod issue;
pub mod permit;
pub mod types;
pub mod validation;

pub use attributes::{is_known_attribute, Attributes, Limit, MergedAttributes, DEFAULT_ATTRIBUTES};
pub use crypto::generate_key;
pub use error::{PermitError, Result};
pub use issue::{expiry_after_months, expiry_for, issue, IssueRequest, Issued, PermitKind};
pub use permit::{Mutation, Permit, KEY_LENGTH, PERMIT_VERSION};
pub use types::StorageAddress;
pub use validation::{
    check_domain_bounds, check_key_bounds, ensure_domain, validate_domain, MAX_DOMAIN_LEN,
    MAX_KEY_LEN, MIN_DOMAIN_LEN, MIN_KEY_LEN,
};
