use super::KeyValueStore;
use crate::constants::*;
use crate::error::StoreError;
use crate::models::{Entry, InterstitialSettings};
use log::warn;
use serde_json::Value;
use std::collections::HashSet;

/// Entry list plus the next id to hand out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredState {
    pub entries: Vec<Entry>,
    pub next_id: i64,
}

impl Default for StoredState {
    fn default() -> Self {
        Self { entries: Vec::new(), next_id: RULE_ID_START }
    }
}

/// Load entries and the id counter.
///
/// Missing or wrong-shaped values read as an empty list and the base id.
/// Records are migrated to the canonical shape; duplicates by id or by
/// `(type, value)` keep their first occurrence. The counter is raised
/// above every stored id; a counter outside the matcher's id range is
/// treated as missing.
pub fn load_entries<S: KeyValueStore + ?Sized>(kv: &S) -> Result<StoredState, StoreError> {
    let raw_entries = kv.get(ENTRIES_KEY)?;
    let raw_next_id = kv.get(NEXT_ID_KEY)?;

    let records = match raw_entries {
        Some(Value::Array(records)) => records,
        Some(other) => {
            warn!("Stored entry list is not an array ({other}), starting empty");
            Vec::new()
        }
        None => Vec::new(),
    };

    let mut ids = HashSet::new();
    let mut values = HashSet::new();
    let mut entries = Vec::with_capacity(records.len());
    let mut max_id = None;
    for entry in records.into_iter().filter_map(Entry::migrate) {
        max_id = max_id.max(Some(entry.id));
        if !ids.insert(entry.id) || !values.insert((entry.entry_type, entry.value.clone())) {
            warn!("Dropping duplicate entry {} ({})", entry.id, entry.value);
            continue;
        }
        entries.push(entry);
    }

    // A counter the matcher could never accept is corrupt and reads as fresh
    let stored_next = match raw_next_id.as_ref().and_then(Value::as_i64) {
        Some(next) if (RULE_ID_START..=MAX_RULE_ID + 1).contains(&next) => next,
        Some(next) => {
            warn!("Stored rule id counter {next} is out of range, resetting");
            RULE_ID_START
        }
        None => RULE_ID_START,
    };
    // Dropped duplicates count too: their ids may still be live in the engine.
    // Migrated ids are at most MAX_RULE_ID, so this cannot overflow.
    let next_id = max_id.map_or(stored_next, |id| stored_next.max(id + 1));

    Ok(StoredState { entries, next_id })
}

/// Persist entries and the id counter in a single write.
pub fn save_entries<S: KeyValueStore + ?Sized>(
    kv: &S,
    entries: &[Entry],
    next_id: i64,
) -> Result<(), StoreError> {
    let entries = serde_json::to_value(entries)?;
    kv.set_many(&[(ENTRIES_KEY, entries), (NEXT_ID_KEY, Value::from(next_id))])
}

/// Persisted default catalog; empty when absent or not a list of strings.
pub fn load_catalog<S: KeyValueStore + ?Sized>(kv: &S) -> Result<Vec<String>, StoreError> {
    Ok(match kv.get(CATALOG_KEY)? {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(ToString::to_string)
            .collect(),
        Some(_) | None => Vec::new(),
    })
}

pub fn save_catalog<S: KeyValueStore + ?Sized>(kv: &S, domains: &[String]) -> Result<(), StoreError> {
    kv.set_many(&[(CATALOG_KEY, serde_json::to_value(domains)?)])
}

const SETTINGS_KEYS: [&str; 8] = [
    MODE_KEY,
    MESSAGE_KEY,
    BG_MODE_KEY,
    BG_URL_KEY,
    BG_FIT_KEY,
    CARD_OPACITY_KEY,
    AUDIO_MODE_KEY,
    AUDIO_URL_KEY,
];

pub fn load_settings<S: KeyValueStore + ?Sized>(kv: &S) -> Result<InterstitialSettings, StoreError> {
    let values = kv.get_many(&SETTINGS_KEYS)?;
    Ok(InterstitialSettings::from_stored(&values))
}

pub fn save_settings<S: KeyValueStore + ?Sized>(
    kv: &S,
    settings: &InterstitialSettings,
) -> Result<(), StoreError> {
    kv.set_many(&settings.to_stored())
}
