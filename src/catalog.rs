use crate::constants::DEFAULT_DOMAINS;
use crate::error::StoreError;
use crate::store::{load_catalog, save_catalog, KeyValueStore};
use crate::validation::normalize_domain;
use log::info;
use std::collections::HashSet;

/// The default-domain catalog: an ordered set of canonical domains.
///
/// Immutable once built; the synchronizer swaps in a new one on reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    domains: Vec<String>,
    members: HashSet<String>,
}

/// Canonical form of a catalog or stored domain value. Values that do not
/// parse are kept as written.
pub fn canonical_domain(value: &str) -> String {
    let normalized = normalize_domain(value);
    if normalized.is_empty() {
        value.to_string()
    } else {
        normalized
    }
}

impl Catalog {
    pub fn new<I, T>(domains: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut catalog = Self::default();
        for domain in domains {
            let domain = canonical_domain(domain.as_ref());
            if !domain.is_empty() && catalog.members.insert(domain.clone()) {
                catalog.domains.push(domain);
            }
        }
        catalog
    }

    pub fn builtin() -> Self {
        Self::new(DEFAULT_DOMAINS)
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.members.contains(domain)
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Load the persisted catalog, seeding the built-in list on first run.
pub fn load_or_seed<S: KeyValueStore + ?Sized>(kv: &S) -> Result<Catalog, StoreError> {
    load_or_seed_with(kv, &Catalog::builtin())
}

/// Like [`load_or_seed`] with an explicit fallback list.
pub fn load_or_seed_with<S: KeyValueStore + ?Sized>(kv: &S, builtin: &Catalog) -> Result<Catalog, StoreError> {
    let stored = load_catalog(kv)?;
    if !stored.is_empty() {
        return Ok(Catalog::new(stored));
    }

    save_catalog(kv, builtin.domains())?;
    info!("Seeded default catalog with {} domains", builtin.len());
    Ok(builtin.clone())
}
