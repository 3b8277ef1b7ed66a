//! The request matcher that enforces compiled rules.
//!
//! The synchronizer pushes diffs for every mutation and reads the live id
//! set back only when reconciling.

pub mod ruleset;

pub use ruleset::RulesetFile;

use crate::compiler::RuleDiff;
use crate::error::EngineError;
use std::collections::HashSet;

pub trait RuleEngine: Send + Sync {
    /// Apply a diff. On failure the previous rule set must be left intact.
    fn apply_diff(&self, diff: &RuleDiff) -> Result<(), EngineError>;

    /// Ids of every rule currently installed.
    fn rule_ids(&self) -> Result<Vec<i64>, EngineError>;
}

/// Reject diffs that add and remove the same id, or add an id twice.
pub fn check_disjoint(diff: &RuleDiff) -> Result<(), EngineError> {
    let removed: HashSet<i64> = diff.remove_rule_ids.iter().copied().collect();
    let mut added = HashSet::new();
    for rule in &diff.add_rules {
        if removed.contains(&rule.id) {
            return Err(EngineError::Rejected(format!(
                "Rule with id {} is both added and removed",
                rule.id
            )));
        }
        if !added.insert(rule.id) {
            return Err(EngineError::Rejected(format!("Rule with id {} does not have a unique ID.", rule.id)));
        }
    }
    Ok(())
}
