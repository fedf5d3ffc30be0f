//! SQLite implementation of the Keeper trait.
//!
//! An alternative to the filesystem backend for operators who would rather
//! keep one database file. It uses rusqlite with bundled SQLite, wrapped in
//! async via tokio::spawn_blocking.
//!
//! Rows are keyed by the hex [`StorageAddress`] and carry the full permit as
//! JSON, so records move between backends unchanged.
//!
//! One connection behind one mutex serves every address, so operations on
//! different keys queue behind each other. That keeps create and
//! read-modify-write atomic through SQLite itself; deployments that need
//! independent progress per key use [`crate::FsStore`].

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use permit_core::{Mutation, Permit, StorageAddress};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Keeper, ListQuery};

/// SQLite-based store implementation.
///
/// All operations run under `spawn_blocking` while holding the connection
/// mutex, so statements from different tasks never interleave.
#[derive(Clone)]
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path).map_err(StoreError::database("open"))?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(StoreError::database("open"))?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` on the connection inside a blocking task.
    async fn with_conn<F, T>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn, op)?;
            f(&mut conn)
        })
        .await
        .map_err(StoreError::task(op))?
    }
}

fn lock<'a>(conn: &'a Mutex<Connection>, op: &'static str) -> Result<MutexGuard<'a, Connection>> {
    conn.lock().map_err(|e| StoreError::Database {
        op,
        source: rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            Some(format!("mutex poisoned: {}", e)),
        ),
    })
}

fn decode(address: StorageAddress, record: &str) -> Result<Permit> {
    let permit: Permit = serde_json::from_str(record)
        .map_err(|e| StoreError::serialization("decode", address, e))?;
    if !address.matches(&permit.key) {
        return Err(StoreError::InvalidData(format!(
            "row {address} holds a permit for a different key"
        )));
    }
    Ok(permit)
}

fn encode(address: StorageAddress, permit: &Permit) -> Result<String> {
    serde_json::to_string(permit).map_err(|e| StoreError::serialization("encode", address, e))
}

fn select_record(conn: &Connection, address: StorageAddress) -> Result<Permit> {
    let record: Option<String> = conn
        .query_row(
            "SELECT record FROM permits WHERE address = ?1",
            params![address.to_hex()],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::database("get"))?;

    match record {
        Some(record) => decode(address, &record),
        None => Err(StoreError::NotFound { address }),
    }
}

/// Same filter and order as [`ListQuery::apply`]: key prefix or ASCII
/// case-insensitive domain substring, then issued, domain and address.
const LIST_SQL: &str = "
    SELECT address, record FROM permits
    WHERE ?1 = ''
       OR substr(json_extract(record, '$.key'), 1, length(?1)) = ?1
       OR instr(lower(domain), lower(?1)) > 0
    ORDER BY issued, domain, address";

/// Nanosecond precision with a `Z` suffix is fixed width, so text order is time order.
fn issued_column(issued: DateTime<Utc>) -> String {
    issued.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl Keeper for SqliteStore {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Permit>> {
        let query = query.as_str().to_string();

        self.with_conn("list", move |conn| {
            let mut stmt = conn
                .prepare(LIST_SQL)
                .map_err(StoreError::database("list"))?;

            let rows = stmt
                .query_map(params![query], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(StoreError::database("list"))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(StoreError::database("list"))?;

            rows.into_iter()
                .map(|(address, record)| {
                    let address = address.parse::<StorageAddress>().map_err(|e| {
                        StoreError::InvalidData(format!("bad address column: {e}"))
                    })?;
                    decode(address, &record)
                })
                .collect::<Result<Vec<_>>>()
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Permit> {
        let address = StorageAddress::derive(key);
        self.with_conn("get", move |conn| select_record(conn, address)).await
    }

    async fn create(&self, permit: &Permit) -> Result<()> {
        let address = permit.address();
        let record = encode(address, permit)?;
        let domain = permit.domain.clone();
        let issued = issued_column(permit.issued);

        self.with_conn("create", move |conn| {
            match conn.execute(
                "INSERT INTO permits (address, domain, issued, record) VALUES (?1, ?2, ?3, ?4)",
                params![address.to_hex(), domain, issued, record],
            ) {
                Ok(_) => {
                    debug!(%address, "permit created");
                    Ok(())
                }
                Err(e) if is_constraint_violation(&e) => Err(StoreError::AlreadyExists { address }),
                Err(e) => Err(StoreError::database("create")(e)),
            }
        })
        .await
    }

    async fn update(&self, key: &str, mutation: Mutation) -> Result<()> {
        let address = StorageAddress::derive(key);

        self.with_conn(mutation.name(), move |conn| {
            let tx = conn.transaction().map_err(StoreError::database("update"))?;

            let mut permit = select_record(&tx, address)?;
            permit.apply(&mutation);
            tx.execute(
                "UPDATE permits SET record = ?2 WHERE address = ?1",
                params![address.to_hex(), encode(address, &permit)?],
            )
            .map_err(StoreError::database("update"))?;

            tx.commit().map_err(StoreError::database("update"))?;
            debug!(%address, op = mutation.name(), "permit updated");
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let address = StorageAddress::derive(key);

        self.with_conn("delete", move |conn| {
            let removed = conn
                .execute(
                    "DELETE FROM permits WHERE address = ?1",
                    params![address.to_hex()],
                )
                .map_err(StoreError::database("delete"))?;

            if removed == 0 {
                return Err(StoreError::NotFound { address });
            }
            debug!(%address, "permit deleted");
            Ok(())
        })
        .await
    }
}
