//! Plain text rendering of permits for the operator CLI.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use permit_core::Permit;

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn expiry(permit: &Permit) -> String {
    permit.expires.map_or_else(|| "never".to_string(), timestamp)
}

/// One `list` line: key, domain, valid flag, expiry.
pub fn summary_line(permit: &Permit) -> String {
    format!(
        "{:<64}\t{:<50}\t{}\t{}",
        permit.key,
        permit.domain,
        permit.valid,
        expiry(permit)
    )
}

/// Every field of a permit, attributes last.
pub fn details(permit: &Permit) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "Version: {}", permit.version);
    let _ = writeln!(out, "Key:     {}", permit.key);
    let _ = writeln!(out, "Domain:  {}", permit.domain);
    let _ = writeln!(out, "Valid:   {}", permit.valid);
    let _ = writeln!(out, "Expires: {}", expiry(permit));
    let _ = writeln!(out, "Issued:  {}", timestamp(permit.issued));
    if !permit.contact.is_empty() {
        let _ = writeln!(out, "Contact: {}", permit.contact);
    }
    if !permit.entity.is_empty() {
        let _ = writeln!(out, "Entity:  {}", permit.entity);
    }
    if !permit.attributes.is_empty() {
        let _ = writeln!(out, "---------------------------------------------");
        for (name, value) in permit.attributes.iter() {
            let _ = writeln!(out, "{value:>8} {name}");
        }
    }
    out
}
