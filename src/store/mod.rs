//! Durable key-value storage.
//!
//! Mirrors the browser extension storage area: values are JSON documents
//! addressed by key, there are no prefix queries, and a multi-key write
//! is applied as one unit.

pub mod entries;
pub mod memory;

pub use entries::{load_catalog, load_entries, load_settings, save_catalog, save_entries, save_settings, StoredState};
pub use memory::MemoryStore;

use crate::db::{migrations, with_connection, with_connection_mut, Database};
use crate::error::StoreError;
use log::warn;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

pub trait KeyValueStore: Send + Sync {
    /// Read one key. Missing keys are `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write every pair, all or nothing.
    fn set_many(&self, items: &[(&str, Value)]) -> Result<(), StoreError>;

    fn get_many(&self, keys: &[&'static str]) -> Result<Vec<(&'static str, Option<Value>)>, StoreError> {
        keys.iter().map(|key| Ok((*key, self.get(key)?))).collect()
    }
}

/// SQLite-backed store; one row per key.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Database::open(path)?;
        migrations::run(db.connection())?;
        Ok(Self { db: Mutex::new(db) })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = with_connection(&self.db, &format!("read {key}"), |conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
                .optional()
        })?;

        // A cell that is not valid JSON reads as absent
        Ok(raw.and_then(|text| match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring unreadable value for {key}: {e}");
                None
            }
        }))
    }

    fn set_many(&self, items: &[(&str, Value)]) -> Result<(), StoreError> {
        let encoded = items
            .iter()
            .map(|(key, value)| Ok((*key, serde_json::to_string(value)?)))
            .collect::<Result<Vec<_>, serde_json::Error>>()?;

        with_connection_mut(&self.db, "write storage", |conn| {
            let tx = conn.transaction()?;
            for (key, text) in &encoded {
                tx.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, text],
                )?;
            }
            tx.commit()
        })
    }
}
