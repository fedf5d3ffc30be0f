//! Versioned SQLite schema.
//!
//! The schema version lives in `PRAGMA user_version`. `MIGRATIONS[n]` moves a
//! database from version `n` to `n + 1`; pending steps run in one transaction.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, StoreError};

const V1: &str = r#"
    -- One row per permit, keyed by the hex digest of its key
    CREATE TABLE permits (
        address TEXT PRIMARY KEY,   -- never the key itself
        domain TEXT NOT NULL,       -- copied out of the record for filtering
        issued TEXT NOT NULL,       -- fixed-width RFC 3339, sorts chronologically
        record TEXT NOT NULL        -- full permit as JSON
    );

    CREATE INDEX idx_permits_listing ON permits(issued, domain, address);
"#;

const MIGRATIONS: &[&str] = &[V1];

/// Schema version this build writes.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call on every open.
///
/// A database written by a newer build is refused rather than guessed at.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let found: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(StoreError::database("migrate"))?;

    if found > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "schema version {found} is newer than supported version {CURRENT_VERSION}"
        )));
    }
    if found == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction().map_err(StoreError::database("migrate"))?;
    for (step, sql) in MIGRATIONS.iter().enumerate().skip(found as usize) {
        tx.execute_batch(sql).map_err(StoreError::database("migrate"))?;
        debug!(version = step + 1, "applied schema migration");
    }
    tx.pragma_update(None, "user_version", CURRENT_VERSION)
        .map_err(StoreError::database("migrate"))?;
    tx.commit().map_err(StoreError::database("migrate"))
}
