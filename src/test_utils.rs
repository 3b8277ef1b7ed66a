//! Shared test utilities for Refuge.
//!
//! This module provides common setup functions used across test modules.

#![cfg(test)]

use crate::compiler::RuleDiff;
use crate::engine::{check_disjoint, RuleEngine};
use crate::error::EngineError;
use crate::store::SqliteStore;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

/// Create a store on a temporary SQLite database with migrations applied.
///
/// Returns a tuple of (SqliteStore, TempDir). The TempDir must be kept alive
/// for the duration of the test to prevent the database file from being deleted.
pub fn setup_test_store() -> (SqliteStore, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory for test DB");
    let store = SqliteStore::open(&dir.path().join("test.db")).expect("Failed to open test store");
    (store, dir)
}

/// In-memory rule engine that records every diff it accepts.
#[derive(Default)]
pub struct RecordingEngine {
    live: Mutex<BTreeSet<i64>>,
    diffs: Mutex<Vec<RuleDiff>>,
    fail: AtomicBool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `apply_diff` fail like an unavailable API.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Ids currently installed, ascending.
    pub fn live_ids(&self) -> Vec<i64> {
        self.live.lock().unwrap().iter().copied().collect()
    }

    /// Number of accepted diffs.
    pub fn diff_count(&self) -> usize {
        self.diffs.lock().unwrap().len()
    }

    /// How many accepted diffs asked to remove `id`.
    pub fn removals_of(&self, id: i64) -> usize {
        self.diffs
            .lock()
            .unwrap()
            .iter()
            .filter(|diff| diff.remove_rule_ids.contains(&id))
            .count()
    }
}

impl RuleEngine for RecordingEngine {
    fn apply_diff(&self, diff: &RuleDiff) -> Result<(), EngineError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("Dynamic rules API not available.".into()));
        }
        check_disjoint(diff)?;

        let mut live = self.live.lock().unwrap();
        let mut next = live.clone();
        for id in &diff.remove_rule_ids {
            next.remove(id);
        }
        for rule in &diff.add_rules {
            if !next.insert(rule.id) {
                return Err(EngineError::Rejected(format!("Rule with id {} does not have a unique ID.", rule.id)));
            }
        }
        *live = next;
        self.diffs.lock().unwrap().push(diff.clone());
        Ok(())
    }

    fn rule_ids(&self) -> Result<Vec<i64>, EngineError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("Dynamic rules API not available.".into()));
        }
        Ok(self.live_ids())
    }
}
