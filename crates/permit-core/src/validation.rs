//! Input validation: domain pattern and length bounds.
//!
//! These checks run on every request that names a domain or presents a key,
//! and again on every validity check of a stored permit. Nothing here trusts
//! a value because it was read back from storage.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PermitError, Result};

/// Minimum length of a key presented on the check path.
pub const MIN_KEY_LEN: usize = 4;
/// Maximum length of a key presented on the check path.
pub const MAX_KEY_LEN: usize = 100;
/// Minimum length of a domain.
pub const MIN_DOMAIN_LEN: usize = 4;
/// Maximum length of a domain.
pub const MAX_DOMAIN_LEN: usize = 100;

/// Dot separated labels of alnum/hyphen/underscore, an alphabetic TLD of 2 to 11 chars.
#[allow(clippy::expect_used)] // literal pattern, cannot fail
static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9_-]+\.)*[a-zA-Z0-9][a-zA-Z0-9_-]+\.[a-zA-Z]{2,11}$")
        .expect("static regex should not panic")
});

/// Check a domain against the domain-name pattern.
///
/// Pure and lock free; safe to call from any number of tasks.
pub fn validate_domain(domain: &str) -> bool {
    DOMAIN_PATTERN.is_match(domain)
}

/// Check a domain's pattern, returning an error instead of a flag.
pub fn ensure_domain(domain: &str) -> Result<()> {
    if validate_domain(domain) {
        Ok(())
    } else {
        Err(PermitError::InvalidDomain)
    }
}

/// Check the length bounds applied to a key on the check path.
pub fn check_key_bounds(key: &str) -> Result<()> {
    let len = key.chars().count();
    if !(MIN_KEY_LEN..=MAX_KEY_LEN).contains(&len) {
        return Err(PermitError::KeyLength {
            len,
            min: MIN_KEY_LEN,
            max: MAX_KEY_LEN,
        });
    }
    Ok(())
}

/// Check the length bounds applied to a domain.
pub fn check_domain_bounds(domain: &str) -> Result<()> {
    let len = domain.chars().count();
    if !(MIN_DOMAIN_LEN..=MAX_DOMAIN_LEN).contains(&len) {
        return Err(PermitError::DomainLength {
            len,
            min: MIN_DOMAIN_LEN,
            max: MAX_DOMAIN_LEN,
        });
    }
    Ok(())
}
