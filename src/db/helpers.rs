// src/db/helpers.rs

use crate::db::Database;
use crate::error::StoreError;
use rusqlite::Connection;
use std::sync::Mutex;

/// Execute a database operation with lock handling and error logging.
///
/// # Example
/// ```ignore
/// with_connection(&db, "read blacklistEntries", |conn| {
///     conn.query_row("SELECT value FROM kv WHERE key = ?1", ["blacklistEntries"], |r| r.get(0))
/// })
/// ```
pub fn with_connection<F, T>(db: &Mutex<Database>, operation: &str, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&Connection) -> rusqlite::Result<T>,
{
    let db = db.lock().map_err(|e| {
        log::error!("Failed to acquire database lock for {operation}: {e}");
        StoreError::Unavailable(format!("database lock poisoned during {operation}"))
    })?;

    f(db.connection()).map_err(|e| {
        log::error!("Failed to {operation}: {e}");
        StoreError::from(e)
    })
}

/// Like [`with_connection`] but hands out a mutable connection, for
/// operations that open a transaction.
pub fn with_connection_mut<F, T>(db: &Mutex<Database>, operation: &str, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&mut Connection) -> rusqlite::Result<T>,
{
    let mut db = db.lock().map_err(|e| {
        log::error!("Failed to acquire database lock for {operation}: {e}");
        StoreError::Unavailable(format!("database lock poisoned during {operation}"))
    })?;

    f(db.connection_mut()).map_err(|e| {
        log::error!("Failed to {operation}: {e}");
        StoreError::from(e)
    })
}
