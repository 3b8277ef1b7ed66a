//! Compiles entries into redirect rules for the browser's declarative
//! request matcher. Compilation is pure: the same `(id, type, value)`
//! always yields the same rule.

use crate::constants::*;
use crate::models::{Entry, EntryType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Redirect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    pub extension_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub redirect: Redirect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_filter: Option<String>,
    pub is_url_filter_case_sensitive: bool,
    pub resource_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_domains: Vec<String>,
}

/// A block-and-redirect rule. `id` always equals the owning entry's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherRule {
    pub id: i64,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

impl MatcherRule {
    pub fn is_regex(&self) -> bool {
        self.condition.regex_filter.is_some()
    }
}

/// A change to the live rule set. Add and remove ids must be disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDiff {
    pub add_rules: Vec<MatcherRule>,
    pub remove_rule_ids: Vec<i64>,
}

impl RuleDiff {
    pub fn add(rules: Vec<MatcherRule>) -> Self {
        Self { add_rules: rules, remove_rule_ids: Vec::new() }
    }

    pub fn remove(ids: Vec<i64>) -> Self {
        Self { add_rules: Vec::new(), remove_rule_ids: ids }
    }

    pub fn is_empty(&self) -> bool {
        self.add_rules.is_empty() && self.remove_rule_ids.is_empty()
    }
}

fn redirect_action() -> RuleAction {
    RuleAction {
        action_type: ActionType::Redirect,
        redirect: Redirect { extension_path: INTERSTITIAL_PATH.to_string() },
    }
}

/// Domain-boundary filter: the host or any subdomain, anchored.
pub fn to_url_filter(domain: &str) -> String {
    format!("||{domain}^")
}

/// Regex fragment matching a keyword or phrase inside a URL.
///
/// Each word is escaped so user text is always literal. Words of a phrase
/// are joined by a gap matching one or more encoded spaces, so "foo bar"
/// matches "foo+bar", "foo%20bar" and "foo++bar".
pub fn keyword_to_regex_filter(keyword: &str) -> String {
    keyword
        .split(' ')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(ENCODED_GAP)
}

pub fn build_domain_rule(id: i64, domain: &str) -> MatcherRule {
    MatcherRule {
        id,
        priority: RULE_PRIORITY,
        action: redirect_action(),
        condition: RuleCondition {
            url_filter: Some(to_url_filter(domain)),
            regex_filter: None,
            is_url_filter_case_sensitive: false,
            resource_types: vec![MAIN_FRAME.to_string()],
            request_domains: Vec::new(),
        },
    }
}

/// Keyword rules only fire on top-level navigations to known search engines.
pub fn build_keyword_rule(id: i64, keyword: &str) -> MatcherRule {
    MatcherRule {
        id,
        priority: RULE_PRIORITY,
        action: redirect_action(),
        condition: RuleCondition {
            url_filter: None,
            regex_filter: Some(format!(".*{}.*", keyword_to_regex_filter(keyword))),
            is_url_filter_case_sensitive: false,
            resource_types: vec![MAIN_FRAME.to_string()],
            request_domains: SEARCH_DOMAINS.iter().map(ToString::to_string).collect(),
        },
    }
}

pub fn compile(id: i64, entry_type: EntryType, value: &str) -> MatcherRule {
    match entry_type {
        EntryType::Domain => build_domain_rule(id, value),
        EntryType::Keyword => build_keyword_rule(id, value),
    }
}

pub fn compile_entry(entry: &Entry) -> MatcherRule {
    compile(entry.id, entry.entry_type, &entry.value)
}
