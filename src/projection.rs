//! Classification of entries and the read-only views handed to the
//! options page.

use crate::catalog::{canonical_domain, Catalog};
use crate::models::{Entry, EntryType, Source};
use serde::Serialize;
use std::cmp::Reverse;

/// Whether an entry belongs to the non-removable default set.
///
/// True when the entry was stored as seed data, or when it is a domain
/// entry whose canonical value is in the current catalog. The second
/// check keeps entries written under an older catalog classified right.
pub fn is_seed_entry(entry: &Entry, catalog: &Catalog) -> bool {
    if entry.source == Source::Seed {
        return true;
    }
    match entry.entry_type {
        EntryType::Domain => catalog.contains(&canonical_domain(&entry.value)),
        EntryType::Keyword => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    /// Absent for catalog domains with no stored entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListView {
    pub items: Vec<ListItem>,
    pub count: usize,
}

impl ListView {
    fn new(items: Vec<ListItem>) -> Self {
        let count = items.len();
        Self { items, count }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Views {
    pub user_domains: ListView,
    pub user_keywords: ListView,
    pub defaults: ListView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }
}

/// Newest first; equal or missing timestamps fall back to descending id.
fn user_list(mut entries: Vec<&Entry>) -> ListView {
    entries.sort_by_key(|e| (Reverse(e.added_at), Reverse(e.id)));
    ListView::new(
        entries
            .into_iter()
            .map(|e| ListItem { id: Some(e.id), value: e.value.clone() })
            .collect(),
    )
}

/// Catalog domains, or the stored seed entries when the catalog is empty,
/// in ascending order.
fn default_list(seeds: &[&Entry], entries: &[Entry], catalog: &Catalog) -> ListView {
    let mut values: Vec<String> = if catalog.is_empty() {
        seeds.iter().map(|e| e.value.clone()).collect()
    } else {
        catalog.domains().to_vec()
    };
    values.sort();
    values.dedup();

    let items = values
        .into_iter()
        .map(|value| {
            let id = entries
                .iter()
                .find(|e| e.entry_type == EntryType::Domain && canonical_domain(&e.value) == value)
                .map(|e| e.id);
            ListItem { id, value }
        })
        .collect();
    ListView::new(items)
}

pub fn project(entries: &[Entry], catalog: &Catalog) -> Views {
    let (seeds, user): (Vec<&Entry>, Vec<&Entry>) =
        entries.iter().partition(|e| is_seed_entry(e, catalog));

    let (domains, keywords): (Vec<&Entry>, Vec<&Entry>) =
        user.into_iter().partition(|e| e.entry_type == EntryType::Domain);

    Views {
        user_domains: user_list(domains),
        user_keywords: user_list(keywords),
        defaults: default_list(&seeds, entries, catalog),
    }
}
