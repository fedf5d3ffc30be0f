//! Key generation for permits.
//!
//! A permit key is a bearer secret. It is drawn from the operating system's
//! CSPRNG so that observing any number of issued keys says nothing about the
//! next one.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

use crate::permit::KEY_LENGTH;

/// Generate a fresh permit key of [`KEY_LENGTH`] alphanumeric characters.
pub fn generate_key() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect()
}
