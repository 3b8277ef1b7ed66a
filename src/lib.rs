pub mod catalog;
pub mod compiler;
pub mod constants;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod native_host;
pub mod projection;
pub mod store;
pub mod sync;
#[cfg(test)]
mod test_utils;
pub mod validation;

use crate::engine::RulesetFile;
use crate::error::{AppError, StoreError};
use crate::store::SqliteStore;
use crate::sync::Synchronizer;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "REFUGE_DATA_DIR";

const DB_FILE: &str = "refuge.db";
const RULES_FILE: &str = "rules.json";

/// Error type for Refuge initialization failures
#[derive(Debug)]
pub enum InitError {
    NoProjectDirs,
    DataDirCreation(std::io::Error),
    StoreOpen(StoreError),
    Catalog(AppError),
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::NoProjectDirs => write!(f, "Could not determine project directories"),
            InitError::DataDirCreation(e) => write!(f, "Could not create data directory: {e}"),
            InitError::StoreOpen(e) => write!(f, "Failed to open store: {e}"),
            InitError::Catalog(e) => write!(f, "Failed to load default catalog: {e}"),
        }
    }
}

impl std::error::Error for InitError {}

/// Data directory: `REFUGE_DATA_DIR` when set, the platform data dir
/// otherwise. Created if missing.
pub fn data_dir() -> Result<PathBuf, InitError> {
    let dir = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        Some(_) | None => ProjectDirs::from("com", "refuge", "Refuge")
            .ok_or(InitError::NoProjectDirs)?
            .data_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&dir).map_err(InitError::DataDirCreation)?;
    Ok(dir)
}

/// Open the SQLite store and exported rule set in `dir`.
pub fn open_in(dir: &Path) -> Result<Synchronizer<SqliteStore, RulesetFile>, InitError> {
    let store = SqliteStore::open(&dir.join(DB_FILE)).map_err(InitError::StoreOpen)?;
    let engine = RulesetFile::new(dir.join(RULES_FILE));
    Synchronizer::open(store, engine).map_err(InitError::Catalog)
}

/// Open the synchronizer over the default data directory.
pub fn open_default() -> Result<Synchronizer<SqliteStore, RulesetFile>, InitError> {
    open_in(&data_dir()?)
}
