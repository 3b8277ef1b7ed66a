use super::KeyValueStore;
use crate::error::StoreError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-process store, used by tests and embedders that persist elsewhere.
/// Writes can be made to fail to exercise persistence error paths.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: &[(&str, Value)]) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.values.lock() {
            for (key, value) in values {
                map.insert((*key).to_string(), value.clone());
            }
        }
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set_many` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let map = self
            .values
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        Ok(map.get(key).cloned())
    }

    fn set_many(&self, items: &[(&str, Value)]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".into()));
        }
        let mut map = self
            .values
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        for (key, value) in items {
            map.insert((*key).to_string(), value.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
