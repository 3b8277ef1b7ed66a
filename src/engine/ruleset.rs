use super::{check_disjoint, RuleEngine};
use crate::compiler::{MatcherRule, RuleDiff};
use crate::constants::{MAX_REGEX_RULES, MAX_RULES};
use crate::error::EngineError;
use log::{debug, warn};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Dynamic rule set kept as a JSON file the extension loads.
///
/// Enforces the same limits the browser applies to dynamic rules, and
/// replaces the file with a rename so readers never see a partial write.
pub struct RulesetFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RulesetFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("RulesetFile: write mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Current rules; a missing file is an empty rule set.
    pub fn rules(&self) -> Result<Vec<MatcherRule>, EngineError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(EngineError::from(e)),
        }
    }

    fn write(&self, rules: &[MatcherRule]) -> Result<(), EngineError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(rules)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn check_rule(rule: &MatcherRule) -> Result<(), EngineError> {
    if let Some(pattern) = &rule.condition.regex_filter {
        Regex::new(pattern).map_err(|e| {
            EngineError::Rejected(format!("Rule with id {} specified an invalid regex: {e}", rule.id))
        })?;
    }
    if rule.condition.url_filter.is_none() && rule.condition.regex_filter.is_none() {
        return Err(EngineError::Rejected(format!("Rule with id {} has no filter", rule.id)));
    }
    Ok(())
}

impl RuleEngine for RulesetFile {
    fn apply_diff(&self, diff: &RuleDiff) -> Result<(), EngineError> {
        check_disjoint(diff)?;
        let _guard = self.lock();

        let removed: HashSet<i64> = diff.remove_rule_ids.iter().copied().collect();
        let mut rules: Vec<MatcherRule> = self
            .rules()?
            .into_iter()
            .filter(|rule| !removed.contains(&rule.id))
            .collect();

        for rule in &diff.add_rules {
            if rules.iter().any(|existing| existing.id == rule.id) {
                return Err(EngineError::Rejected(format!(
                    "Rule with id {} does not have a unique ID.",
                    rule.id
                )));
            }
            check_rule(rule)?;
            rules.push(rule.clone());
        }

        if rules.len() > MAX_RULES {
            return Err(EngineError::Rejected(format!(
                "Dynamic rule count exceeds the limit of {MAX_RULES}"
            )));
        }
        if rules.iter().filter(|rule| rule.is_regex()).count() > MAX_REGEX_RULES {
            return Err(EngineError::Rejected(format!(
                "Regex rule count exceeds the limit of {MAX_REGEX_RULES}"
            )));
        }

        self.write(&rules)?;
        debug!(
            "Applied rule diff: +{} -{} ({} rules live)",
            diff.add_rules.len(),
            diff.remove_rule_ids.len(),
            rules.len()
        );
        Ok(())
    }

    fn rule_ids(&self) -> Result<Vec<i64>, EngineError> {
        Ok(self.rules()?.iter().map(|rule| rule.id).collect())
    }
}
