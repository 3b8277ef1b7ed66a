use crate::catalog::canonical_domain;
use crate::constants::MAX_RULE_ID;
use crate::validation::normalize_keyword;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// What an entry blocks: a host (and its subdomains) or a search phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Domain,
    Keyword,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Domain => "domain",
            EntryType::Keyword => "keyword",
        }
    }

    /// Anything other than "keyword" is a domain, including a missing type.
    pub fn from_stored(s: Option<&str>) -> Self {
        match s {
            Some("keyword") => EntryType::Keyword,
            Some(_) | None => EntryType::Domain,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance: shipped/bulk-installed defaults vs. entries a person added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Seed,
    User,
}

/// One blocking rule record. `id` is shared with the compiled rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: i64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub value: String,
    pub source: Source,
    pub added_at: i64,
}

/// Loosely-typed view of a persisted record. Older records carry
/// `domain` instead of `value` and lack `type`, `source` and `addedAt`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    id: Option<Value>,
    #[serde(rename = "type")]
    entry_type: Option<Value>,
    value: Option<Value>,
    domain: Option<Value>,
    source: Option<Value>,
    added_at: Option<Value>,
}

/// Milliseconds since the Unix epoch, 0 if the clock is unusable.
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(0)
}

impl Entry {
    /// A freshly added user entry, timestamped now.
    pub fn new_user(id: i64, entry_type: EntryType, value: &str) -> Self {
        Self {
            id,
            entry_type,
            value: value.to_string(),
            source: Source::User,
            added_at: current_timestamp_millis(),
        }
    }

    pub fn new_seed(id: i64, domain: &str) -> Self {
        Self {
            id,
            entry_type: EntryType::Domain,
            value: domain.to_string(),
            source: Source::Seed,
            added_at: current_timestamp_millis(),
        }
    }

    /// Migrate one persisted record into the canonical shape.
    ///
    /// Values are brought to the form a fresh add would store, so
    /// records written denormalized by older releases compare equal to new
    /// input. Returns `None` for records without a usable id (an integer
    /// the matcher accepts) or value; callers drop those.
    pub fn migrate(raw: Value) -> Option<Self> {
        let stored: StoredEntry = match serde_json::from_value(raw) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Skipping malformed entry record: {e}");
                return None;
            }
        };

        let id = stored
            .id
            .as_ref()
            .and_then(Value::as_i64)
            .filter(|id| (1..=MAX_RULE_ID).contains(id))?;

        let raw_value = [stored.value.as_ref(), stored.domain.as_ref()]
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .find(|s| !s.trim().is_empty())?;

        let entry_type = EntryType::from_stored(stored.entry_type.as_ref().and_then(Value::as_str));
        let value = match entry_type {
            EntryType::Domain => canonical_domain(raw_value),
            EntryType::Keyword => normalize_keyword(raw_value),
        };
        if value.is_empty() {
            return None;
        }

        let source = match stored.source.as_ref().and_then(Value::as_str) {
            Some("seed") => Source::Seed,
            Some(_) | None => Source::User,
        };

        let added_at = stored.added_at.as_ref().and_then(Value::as_i64).unwrap_or(0);

        Some(Self { id, entry_type, value, source, added_at })
    }
}
