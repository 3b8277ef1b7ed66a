use crate::models::EntryType;
use thiserror::Error;

/// Durable key-value store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Rule engine failure: the engine is unreachable or refused a diff.
/// A failed diff leaves the engine's previous rule set in place.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// `reason` is the sentence shown to the user.
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("{entry_type} '{value}' already exists")]
    AlreadyExists { entry_type: EntryType, value: String },

    #[error("Entry {id} is a default entry and cannot be removed")]
    Protected { id: i64 },

    #[error("Rule engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Rule id space exhausted")]
    IdSpaceExhausted,

    #[error("Lock poisoned")]
    LockPoisoned,
}

impl AppError {
    /// Short status line for the options page. `action` names the failed
    /// operation ("add rule", "remove rule", ...) for infrastructure errors.
    pub fn status_text(&self, action: &str) -> String {
        match self {
            AppError::InvalidInput { reason, .. } => reason.clone(),
            AppError::AlreadyExists { entry_type: EntryType::Domain, .. } => {
                "Already on the blacklist.".to_string()
            }
            AppError::AlreadyExists { entry_type: EntryType::Keyword, .. } => {
                "Keyword already blocked.".to_string()
            }
            AppError::Protected { .. } => "Default entries cannot be removed.".to_string(),
            AppError::Engine(e) => format!("Failed to {action}: {e}"),
            AppError::Store(e) => format!("Failed to {action}: {e}"),
            AppError::IdSpaceExhausted | AppError::LockPoisoned => format!("Failed to {action}: {self}"),
        }
    }
}
