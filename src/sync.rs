//! Keeps the persisted entry list and the live rule set in lockstep.
//!
//! Every mutation follows the same order: validate, load, check, compile,
//! push the diff to the rule engine, and only then commit the store. A
//! failed push leaves the store untouched. A failed commit after a good
//! push withdraws the pushed diff again. Anything that still diverges (a
//! crash between push and commit, a withdrawal that also failed) is
//! repaired by [`Synchronizer::reconcile`], which the native host runs at
//! startup.

use crate::catalog::{self, Catalog};
use crate::compiler::{compile, compile_entry, MatcherRule, RuleDiff};
use crate::constants::MAX_RULE_ID;
use crate::engine::RuleEngine;
use crate::error::AppError;
use crate::models::{Entry, EntryType, InterstitialSettings};
use crate::projection::{is_seed_entry, project, StatusMessage, Views};
use crate::store::{self, load_entries, save_entries, KeyValueStore, StoredState};
use crate::validation::{validate_domain, validate_keyword, validate_settings};
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

/// What a mutation was, for status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add(EntryType),
    Remove,
    InstallDefaults,
    Reconcile,
}

impl Operation {
    fn action(self) -> &'static str {
        match self {
            Operation::Add(EntryType::Domain) => "add rule",
            Operation::Add(EntryType::Keyword) => "add keyword",
            Operation::Remove => "remove rule",
            Operation::InstallDefaults => "install defaults",
            Operation::Reconcile => "synchronize rules",
        }
    }

    /// Status line for a failed operation.
    pub fn failure_status(self, err: &AppError) -> StatusMessage {
        StatusMessage::error(err.status_text(self.action()))
    }
}

/// Reserve `count` consecutive ids starting at `next_id`. Returns the
/// counter value after them.
fn reserve_ids(next_id: i64, count: usize) -> Result<i64, AppError> {
    i64::try_from(count)
        .ok()
        .and_then(|n| next_id.checked_add(n))
        .filter(|end| *end <= MAX_RULE_ID + 1)
        .ok_or(AppError::IdSpaceExhausted)
}

/// A committed mutation: its status line and the re-rendered views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: StatusMessage,
    pub views: Views,
}

pub struct Synchronizer<S, E> {
    store: S,
    engine: E,
    catalog: Catalog,
    /// Serializes load -> compile -> push -> save across callers.
    op_lock: Mutex<()>,
}

impl<S: KeyValueStore, E: RuleEngine> Synchronizer<S, E> {
    pub fn new(store: S, engine: E, catalog: Catalog) -> Self {
        Self { store, engine, catalog, op_lock: Mutex::new(()) }
    }

    /// Build a synchronizer over `store`, seeding the built-in catalog on
    /// first run.
    pub fn open(store: S, engine: E) -> Result<Self, AppError> {
        let catalog = catalog::load_or_seed(&store)?;
        Ok(Self::new(store, engine, catalog))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Re-read the persisted catalog.
    pub fn reload_catalog(&mut self) -> Result<(), AppError> {
        let catalog = catalog::load_or_seed(&self.store)?;
        info!("Reloaded default catalog ({} domains)", catalog.len());
        self.catalog = catalog;
        Ok(())
    }

    fn lock_op(&self) -> MutexGuard<'_, ()> {
        match self.op_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Synchronizer: operation mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn push(&self, op: Operation, diff: &RuleDiff) -> Result<(), AppError> {
        self.engine.apply_diff(diff).map_err(|e| {
            error!("Rule engine rejected diff during {}: {e}", op.action());
            AppError::from(e)
        })
    }

    /// Persist after a successful push. When the write fails, apply `undo`
    /// so the engine matches the store again.
    fn commit(&self, op: Operation, entries: &[Entry], next_id: i64, undo: RuleDiff) -> Result<(), AppError> {
        let Err(e) = save_entries(&self.store, entries, next_id) else {
            return Ok(());
        };
        error!("Failed to save entries during {}: {e}", op.action());
        if let Err(undo_err) = self.engine.apply_diff(&undo) {
            error!("Could not withdraw pushed rules, reconcile will repair: {undo_err}");
        }
        Err(AppError::from(e))
    }

    /// Current views, read straight from the store.
    pub fn render(&self) -> Result<Views, AppError> {
        let state = load_entries(&self.store)?;
        Ok(project(&state.entries, &self.catalog))
    }

    /// Rules compiled from every stored entry; the set the engine mirrors.
    pub fn compiled_rules(&self) -> Result<Vec<MatcherRule>, AppError> {
        let state = load_entries(&self.store)?;
        Ok(state.entries.iter().map(compile_entry).collect())
    }

    pub fn add_domain(&self, raw: &str) -> Result<Outcome, AppError> {
        self.add(EntryType::Domain, raw)
    }

    pub fn add_keyword(&self, raw: &str) -> Result<Outcome, AppError> {
        self.add(EntryType::Keyword, raw)
    }

    /// Add a user entry. The new entry takes the current `next_id`.
    pub fn add(&self, entry_type: EntryType, raw: &str) -> Result<Outcome, AppError> {
        let value = match entry_type {
            EntryType::Domain => validate_domain(raw)?,
            EntryType::Keyword => validate_keyword(raw)?,
        };

        let _guard = self.lock_op();
        let StoredState { mut entries, next_id } = load_entries(&self.store)?;

        if entries.iter().any(|e| e.entry_type == entry_type && e.value == value) {
            warn!("Rejected duplicate {entry_type} '{value}'");
            return Err(AppError::AlreadyExists { entry_type, value });
        }

        let op = Operation::Add(entry_type);
        let new_next_id = reserve_ids(next_id, 1)?;
        let rule = compile(next_id, entry_type, &value);
        debug!("Pushing rule {next_id} for {entry_type} '{value}'");
        self.push(op, &RuleDiff::add(vec![rule]))?;

        entries.insert(0, Entry::new_user(next_id, entry_type, &value));
        self.commit(op, &entries, new_next_id, RuleDiff::remove(vec![next_id]))?;
        info!("Added {entry_type} rule {next_id} for '{value}'");

        let status = match entry_type {
            EntryType::Domain => "Added to blacklist.",
            EntryType::Keyword => "Keyword blocked.",
        };
        Ok(Outcome {
            status: StatusMessage::success(status),
            views: project(&entries, &self.catalog),
        })
    }

    /// Remove an entry by id. Default entries are refused. Removing an id
    /// that is not stored still pushes the removal, so retries are safe.
    pub fn remove(&self, id: i64) -> Result<Outcome, AppError> {
        let _guard = self.lock_op();
        let StoredState { mut entries, next_id } = load_entries(&self.store)?;

        let removed = entries.iter().find(|e| e.id == id);
        if let Some(entry) = removed {
            if is_seed_entry(entry, &self.catalog) {
                warn!("Refused to remove default entry {id} ({})", entry.value);
                return Err(AppError::Protected { id });
            }
        }
        let undo = RuleDiff::add(removed.map(compile_entry).into_iter().collect());

        self.push(Operation::Remove, &RuleDiff::remove(vec![id]))?;

        entries.retain(|e| e.id != id);
        self.commit(Operation::Remove, &entries, next_id, undo)?;
        info!("Removed rule {id}");

        Ok(Outcome {
            status: StatusMessage::success("Removed from blacklist."),
            views: project(&entries, &self.catalog),
        })
    }

    /// Install every catalog domain that has no stored domain entry as a
    /// seed entry, with consecutive ids, in one diff.
    pub fn install_catalog_entries(&self) -> Result<Outcome, AppError> {
        let _guard = self.lock_op();
        let StoredState { mut entries, next_id } = load_entries(&self.store)?;

        let missing: Vec<&String> = self
            .catalog
            .domains()
            .iter()
            .filter(|domain| {
                !entries
                    .iter()
                    .any(|e| e.entry_type == EntryType::Domain && catalog::canonical_domain(&e.value) == **domain)
            })
            .collect();

        if missing.is_empty() {
            return Ok(Outcome {
                status: StatusMessage::success("Default sites already installed."),
                views: project(&entries, &self.catalog),
            });
        }

        let new_next_id = reserve_ids(next_id, missing.len())?;
        let seeded: Vec<Entry> = (next_id..new_next_id)
            .zip(missing)
            .map(|(id, domain)| Entry::new_seed(id, domain))
            .collect();
        let pushed: Vec<i64> = seeded.iter().map(|e| e.id).collect();

        let rules = seeded.iter().map(compile_entry).collect();
        self.push(Operation::InstallDefaults, &RuleDiff::add(rules))?;

        let count = seeded.len();
        entries.extend(seeded);
        self.commit(Operation::InstallDefaults, &entries, new_next_id, RuleDiff::remove(pushed))?;
        info!("Installed {count} default entries");

        Ok(Outcome {
            status: StatusMessage::success(format!("Installed {count} default sites.")),
            views: project(&entries, &self.catalog),
        })
    }

    pub fn load_settings(&self) -> Result<InterstitialSettings, AppError> {
        Ok(store::load_settings(&self.store)?)
    }

    /// Validate, trim and persist interstitial settings. Returns what was
    /// stored.
    pub fn save_settings(&self, settings: &InterstitialSettings) -> Result<InterstitialSettings, AppError> {
        let settings = validate_settings(settings)?;
        store::save_settings(&self.store, &settings)?;
        info!("Saved interstitial settings (mode {})", settings.mode.as_str());
        Ok(settings)
    }

    /// Rebuild the engine's rule set from the store.
    ///
    /// Removes every id the engine reports plus every stored id, then
    /// re-adds a rule for every stored entry. Rules the store does not know
    /// about (left by a push whose commit never happened) are dropped
    /// whatever their ids. Two diffs, since one diff cannot add and remove
    /// the same id.
    pub fn reconcile(&self) -> Result<Outcome, AppError> {
        let _guard = self.lock_op();
        let StoredState { entries, .. } = load_entries(&self.store)?;

        let live = self.engine.rule_ids().map_err(|e| {
            error!("Could not read live rules during {}: {e}", Operation::Reconcile.action());
            AppError::from(e)
        })?;
        let orphaned = live.iter().filter(|id| !entries.iter().any(|e| e.id == **id)).count();
        if orphaned > 0 {
            warn!("Dropping {orphaned} live rules with no stored entry");
        }

        let stale: BTreeSet<i64> = live.into_iter().chain(entries.iter().map(|e| e.id)).collect();
        self.push(Operation::Reconcile, &RuleDiff::remove(stale.into_iter().collect()))?;

        if !entries.is_empty() {
            let rules = entries.iter().map(compile_entry).collect();
            self.push(Operation::Reconcile, &RuleDiff::add(rules))?;
        }
        info!("Reconciled rule engine with {} stored entries", entries.len());

        Ok(Outcome {
            status: StatusMessage::success("Rules synchronized."),
            views: project(&entries, &self.catalog),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ENTRIES_KEY, NEXT_ID_KEY, RULE_ID_START};
    use crate::models::{Mode, Source};
    use crate::store::MemoryStore;
    use crate::test_utils::RecordingEngine;
    use serde_json::json;

    fn setup(catalog: &[&str]) -> Synchronizer<MemoryStore, RecordingEngine> {
        Synchronizer::new(MemoryStore::new(), RecordingEngine::new(), Catalog::new(catalog))
    }

    fn stored(sync: &Synchronizer<MemoryStore, RecordingEngine>) -> StoredState {
        load_entries(sync.store()).unwrap()
    }

    #[test]
    fn test_add_assigns_next_id() {
        let sync = setup(&[]);
        let outcome = sync.add_domain("https://www.Example.com/x").unwrap();

        assert_eq!(outcome.status, StatusMessage::success("Added to blacklist."));
        let state = stored(&sync);
        assert_eq!(state.next_id, RULE_ID_START + 1);
        assert_eq!(state.entries.len(), 1);
        assert_eq!(state.entries[0].id, RULE_ID_START);
        assert_eq!(state.entries[0].value, "example.com");
        assert_eq!(state.entries[0].source, Source::User);
        assert_eq!(sync.engine().live_ids(), vec![RULE_ID_START]);
        assert_eq!(outcome.views.user_domains.count, 1);
    }

    #[test]
    fn test_duplicate_add_is_rejected_without_push() {
        let sync = setup(&[]);
        sync.add_domain("example.com").unwrap();
        let before = stored(&sync);

        let err = sync.add_domain("WWW.EXAMPLE.COM").unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists { entry_type: EntryType::Domain, .. }));
        assert_eq!(stored(&sync), before);
        assert_eq!(sync.engine().diff_count(), 1);
    }

    #[test]
    fn test_same_value_as_domain_and_keyword() {
        let sync = setup(&[]);
        sync.add_domain("example.com").unwrap();
        let outcome = sync.add_keyword("example.com").unwrap();
        assert_eq!(outcome.status.text, "Keyword blocked.");
        assert_eq!(outcome.views.user_keywords.count, 1);
        assert_eq!(outcome.views.user_domains.count, 1);
    }

    #[test]
    fn test_invalid_input_has_no_side_effects() {
        let sync = setup(&[]);
        assert!(matches!(sync.add_domain("example"), Err(AppError::InvalidInput { .. })));
        assert!(matches!(sync.add_keyword("   "), Err(AppError::InvalidInput { .. })));
        assert_eq!(sync.engine().diff_count(), 0);
        assert_eq!(sync.store().write_count(), 0);
    }

    #[test]
    fn test_engine_failure_leaves_store_untouched() {
        let sync = setup(&[]);
        sync.add_domain("a.com").unwrap();
        let before = stored(&sync);
        let writes = sync.store().write_count();

        sync.engine().set_fail(true);
        let err = sync.add_keyword("foo").unwrap_err();
        assert!(matches!(err, AppError::Engine(_)));
        assert_eq!(
            Operation::Add(EntryType::Keyword).failure_status(&err).text,
            "Failed to add keyword: Dynamic rules API not available."
        );
        assert_eq!(stored(&sync), before);
        assert_eq!(sync.store().write_count(), writes);
    }

    #[test]
    fn test_remove_user_entry() {
        let sync = setup(&[]);
        sync.add_domain("c.com").unwrap();

        let outcome = sync.remove(RULE_ID_START).unwrap();
        assert_eq!(outcome.status.text, "Removed from blacklist.");
        assert_eq!(outcome.views.user_domains.count, 0);
        assert!(stored(&sync).entries.is_empty());
        assert_eq!(stored(&sync).next_id, RULE_ID_START + 1, "ids are never reused");
        assert_eq!(sync.engine().removals_of(RULE_ID_START), 1);
    }

    #[test]
    fn test_remove_seed_entry_is_refused() {
        let sync = setup(&["a.com"]);
        save_entries(
            sync.store(),
            &[Entry { id: 1000, entry_type: EntryType::Domain, value: "a.com".into(), source: Source::User, added_at: 0 }],
            1001,
        )
        .unwrap();
        let writes = sync.store().write_count();

        let err = sync.remove(1000).unwrap_err();
        assert!(matches!(err, AppError::Protected { id: 1000 }));
        assert_eq!(sync.engine().diff_count(), 0);
        assert_eq!(sync.store().write_count(), writes);
    }

    #[test]
    fn test_remove_absent_id_is_idempotent() {
        let sync = setup(&[]);
        let outcome = sync.remove(4242).unwrap();
        assert_eq!(outcome.status.text, "Removed from blacklist.");
        assert_eq!(sync.engine().removals_of(4242), 1);
        assert_eq!(sync.store().write_count(), 1);
    }

    #[test]
    fn test_remove_engine_failure() {
        let sync = setup(&[]);
        sync.add_domain("c.com").unwrap();
        sync.engine().set_fail(true);

        let err = sync.remove(RULE_ID_START).unwrap_err();
        assert!(matches!(err, AppError::Engine(_)));
        assert_eq!(stored(&sync).entries.len(), 1);
    }

    #[test]
    fn test_install_catalog_entries_is_idempotent() {
        let sync = setup(&["a.com", "b.com"]);
        sync.add_domain("c.com").unwrap();

        let outcome = sync.install_catalog_entries().unwrap();
        assert_eq!(outcome.status.text, "Installed 2 default sites.");
        let state = stored(&sync);
        assert_eq!(state.entries.len(), 3);
        assert_eq!(state.next_id, RULE_ID_START + 3);
        assert!(state.entries.iter().filter(|e| e.source == Source::Seed).all(|e| e.id > RULE_ID_START));
        assert_eq!(outcome.views.defaults.count, 2);
        assert!(outcome.views.defaults.items.iter().all(|i| i.id.is_some()));

        let diffs = sync.engine().diff_count();
        let again = sync.install_catalog_entries().unwrap();
        assert_eq!(again.status.text, "Default sites already installed.");
        assert_eq!(sync.engine().diff_count(), diffs);
    }

    #[test]
    fn test_persistence_failure_withdraws_pushed_rule() {
        let sync = setup(&[]);
        sync.add_domain("a.com").unwrap();

        sync.store().set_fail_writes(true);
        let err = sync.add_domain("b.com").unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(sync.engine().live_ids(), vec![1000]);
        assert_eq!(sync.engine().removals_of(1001), 1);

        sync.store().set_fail_writes(false);
        sync.add_domain("b.com").unwrap();
        assert_eq!(sync.engine().live_ids(), vec![1000, 1001]);
    }

    #[test]
    fn test_remove_persistence_failure_restores_rule() {
        let sync = setup(&[]);
        sync.add_keyword("foo").unwrap();

        sync.store().set_fail_writes(true);
        assert!(matches!(sync.remove(1000), Err(AppError::Store(_))));
        assert_eq!(sync.engine().live_ids(), vec![1000]);
        assert_eq!(stored(&sync).entries.len(), 1);
    }

    #[test]
    fn test_failed_install_then_reconcile_keeps_adds_working() {
        let sync = setup(&["a.com", "b.com", "c.com"]);

        sync.store().set_fail_writes(true);
        assert!(matches!(sync.install_catalog_entries(), Err(AppError::Store(_))));
        assert!(sync.engine().live_ids().is_empty());
        sync.store().set_fail_writes(false);

        sync.reconcile().unwrap();
        assert!(sync.engine().live_ids().is_empty());

        for domain in ["x.com", "y.com", "z.com"] {
            sync.add_domain(domain).unwrap();
        }
        assert_eq!(sync.engine().live_ids(), vec![1000, 1001, 1002]);
    }

    #[test]
    fn test_reconcile_drops_rules_unknown_to_store() {
        let sync = setup(&[]);
        sync.add_domain("a.com").unwrap();
        // rules pushed by an install whose commit never happened
        let orphans = vec![
            compile(1001, EntryType::Domain, "b.com"),
            compile(1002, EntryType::Domain, "c.com"),
        ];
        sync.engine().apply_diff(&RuleDiff::add(orphans)).unwrap();

        sync.reconcile().unwrap();
        assert_eq!(sync.engine().live_ids(), vec![1000]);

        sync.add_domain("d.com").unwrap();
        sync.add_domain("e.com").unwrap();
        assert_eq!(sync.engine().live_ids(), vec![1000, 1001, 1002]);
    }

    #[test]
    fn test_corrupt_counter_reads_as_fresh() {
        let kv = MemoryStore::with_values(&[(NEXT_ID_KEY, json!(i64::MAX))]);
        let sync = Synchronizer::new(kv, RecordingEngine::new(), Catalog::default());

        sync.add_domain("x.com").unwrap();
        assert_eq!(stored(&sync).entries[0].id, RULE_ID_START);
        assert_eq!(stored(&sync).next_id, RULE_ID_START + 1);
    }

    #[test]
    fn test_id_space_exhaustion_is_an_error() {
        let kv = MemoryStore::with_values(&[(NEXT_ID_KEY, json!(MAX_RULE_ID))]);
        let sync = Synchronizer::new(kv, RecordingEngine::new(), Catalog::new(["a.com"]));

        sync.add_domain("x.com").unwrap();
        assert_eq!(sync.engine().live_ids(), vec![MAX_RULE_ID]);

        let err = sync.add_keyword("foo").unwrap_err();
        assert!(matches!(err, AppError::IdSpaceExhausted));
        assert!(matches!(sync.install_catalog_entries(), Err(AppError::IdSpaceExhausted)));
        assert_eq!(sync.engine().diff_count(), 1);
        assert_eq!(stored(&sync).entries.len(), 1);
    }

    #[test]
    fn test_legacy_denormalized_entry_blocks_duplicate_add() {
        let kv = MemoryStore::with_values(&[(ENTRIES_KEY, json!([{ "id": 1000, "domain": "WWW.Reddit.com" }]))]);
        let sync = Synchronizer::new(kv, RecordingEngine::new(), Catalog::default());

        let err = sync.add_domain("reddit.com").unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists { entry_type: EntryType::Domain, .. }));
        assert_eq!(sync.engine().diff_count(), 0);
    }

    #[test]
    fn test_reconcile_restores_missing_rules() {
        let kv = MemoryStore::with_values(&[
            (ENTRIES_KEY, json!([
                { "id": 1000, "type": "domain", "value": "a.com" },
                { "id": 1001, "type": "keyword", "value": "foo" },
            ])),
            (NEXT_ID_KEY, json!(1002)),
        ]);
        let sync = Synchronizer::new(kv, RecordingEngine::new(), Catalog::default());

        let outcome = sync.reconcile().unwrap();
        assert_eq!(outcome.status.text, "Rules synchronized.");
        assert_eq!(sync.engine().live_ids(), vec![1000, 1001]);
    }

    #[test]
    fn test_open_seeds_catalog() {
        let sync = Synchronizer::open(MemoryStore::new(), RecordingEngine::new()).unwrap();
        assert_eq!(sync.catalog(), &Catalog::builtin());

        let views = sync.render().unwrap();
        assert_eq!(views.defaults.count, Catalog::builtin().len());
        assert_eq!(views.user_domains.count, 0);
    }

    #[test]
    fn test_reload_catalog() {
        let mut sync = setup(&["a.com"]);
        crate::store::save_catalog(sync.store(), &["z.com".to_string()]).unwrap();
        sync.reload_catalog().unwrap();
        assert!(sync.catalog().contains("z.com"));
        assert!(!sync.catalog().contains("a.com"));
    }

    #[test]
    fn test_save_settings_validates() {
        let sync = setup(&[]);
        let bad = InterstitialSettings { mode: Mode::Custom, message: "  ".into(), ..InterstitialSettings::default() };
        assert!(matches!(sync.save_settings(&bad), Err(AppError::InvalidInput { .. })));
        assert_eq!(sync.store().write_count(), 0);

        let good = InterstitialSettings { mode: Mode::Custom, message: " Breathe. ".into(), ..InterstitialSettings::default() };
        let saved = sync.save_settings(&good).unwrap();
        assert_eq!(saved.message, "Breathe.");
        assert_eq!(sync.load_settings().unwrap(), saved);
    }

    #[test]
    fn test_compiled_rules_mirror_store() {
        let sync = setup(&[]);
        sync.add_domain("a.com").unwrap();
        sync.add_keyword("foo bar").unwrap();

        let rules = sync.compiled_rules().unwrap();
        let mut ids: Vec<i64> = rules.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, sync.engine().live_ids());
    }
}
