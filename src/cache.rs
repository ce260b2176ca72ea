//! Environment-scoped intersphinx state.
//!
//! Holds the fetched inventories keyed by base URI, the names of the
//! inventories currently registered, and each domain's index of entries.
//! The per-domain indexes are always rebuilt from the whole cache, never
//! patched one entry at a time.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::domains::{DomainInventory, DomainRegistry};
use crate::error::BuildError;
use crate::inventory::{Inventory, InventoryItemSet};

/// One fetched inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Mapping name, `None` for the legacy unnamed form
    pub name: Option<String>,
    /// Fetch time, seconds since the epoch
    pub timestamp: i64,
    pub inventory: Inventory,
}

/// Reference types excluded from unrestricted intersphinx lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisabledReftypes {
    all: bool,
    all_in_domain: HashSet<String>,
    per_domain: HashMap<String, Vec<String>>,
}

impl DisabledReftypes {
    /// Parse `*`, `domain:*` and `domain:type` entries.
    pub fn parse<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut disabled = Self::default();
        for entry in entries {
            let entry = entry.as_ref();
            if entry == "*" {
                disabled.all = true;
            } else if let Some((domain, objtype)) = entry.split_once(':') {
                if objtype == "*" {
                    disabled.all_in_domain.insert(domain.to_string());
                } else {
                    disabled
                        .per_domain
                        .entry(domain.to_string())
                        .or_default()
                        .push(objtype.to_string());
                }
            } else {
                debug!("ignoring disabled reftype without domain: {}", entry);
            }
        }
        disabled
    }

    pub fn all_objtypes_disabled(&self) -> bool {
        self.all
    }

    pub fn all_domain_objtypes_disabled(&self, domain: &str) -> bool {
        self.all_in_domain.contains(domain)
    }

    pub fn disabled_objtypes_in_domain(&self, domain: &str) -> &[String] {
        self.per_domain
            .get(domain)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Intersphinx data owned by one build environment.
#[derive(Debug, Clone)]
pub struct InventoryState {
    cache: IndexMap<String, CacheEntry>,
    names: HashSet<Option<String>>,
    main_inventory: Inventory,
    by_domain: HashMap<String, DomainInventory>,
    disabled: DisabledReftypes,
}

impl InventoryState {
    pub fn new(disabled: DisabledReftypes, domains: &DomainRegistry) -> Self {
        let mut state = Self {
            cache: IndexMap::new(),
            names: HashSet::new(),
            main_inventory: Inventory::new(),
            by_domain: HashMap::new(),
            disabled,
        };
        state.clear(domains);
        state
    }

    /// Fetched inventories keyed by base URI, in insertion order
    pub fn cache(&self) -> &IndexMap<String, CacheEntry> {
        &self.cache
    }

    /// Store a fetched inventory. An existing entry keeps its position.
    pub fn insert_cache_entry(&mut self, uri: String, entry: CacheEntry) {
        self.cache.insert(uri, entry);
    }

    pub fn disabled(&self) -> &DisabledReftypes {
        &self.disabled
    }

    pub fn inventory_exists(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.as_deref() == Some(name))
    }

    /// Registered inventory names; `None` stands for the unnamed inventory
    pub fn names(&self) -> &HashSet<Option<String>> {
        &self.names
    }

    /// Flat `domain:type -> name -> item` view over every inventory
    pub fn main_inventory(&self) -> &Inventory {
        &self.main_inventory
    }

    pub fn domain_inventory(&self, domain: &str) -> Option<&DomainInventory> {
        self.by_domain.get(domain)
    }

    /// Drop everything derived from the cache and re-seed empty stores.
    pub fn clear(&mut self, domains: &DomainRegistry) {
        self.names.clear();
        self.main_inventory.clear();
        self.by_domain.clear();
        for domain in domains.iter() {
            self.by_domain
                .insert(domain.name().to_string(), domain.initial_inventory());
        }
    }

    /// Rebuild names, the flat inventory and the per-domain stores from the cache.
    ///
    /// # Panics
    ///
    /// If two cache entries carry the same inventory name.
    pub fn rebuild(&mut self, domains: &DomainRegistry) {
        self.clear(domains);

        // flat view: named inventories in name order, then unnamed ones;
        // later inventories override earlier ones
        let mut named: Vec<&CacheEntry> =
            self.cache.values().filter(|e| e.name.is_some()).collect();
        named.sort_by(|a, b| a.name.cmp(&b.name));
        let unnamed = self.cache.values().filter(|e| e.name.is_none());
        for entry in named.into_iter().chain(unnamed) {
            for (objtype, objects) in &entry.inventory {
                self.main_inventory
                    .entry(objtype.clone())
                    .or_default()
                    .extend(objects.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }

        // domain -> objtype -> name -> item set
        let mut entries: HashMap<String, DomainInventory> = HashMap::new();
        for entry in self.cache.values() {
            assert!(
                self.names.insert(entry.name.clone()),
                "inventory name {:?} registered twice",
                entry.name
            );

            for (inv_objtype, objects) in &entry.inventory {
                let Some((domain_name, objtype)) = inv_objtype.split_once(':') else {
                    continue;
                };
                // skip objects in domains we don't use
                if !domains.contains(domain_name) {
                    continue;
                }
                let domain_entries = entries.entry(domain_name.to_string()).or_default();
                for (object_name, item) in objects {
                    domain_entries
                        .entry(objtype, object_name)
                        .append(entry.name.clone(), item.clone());
                }
            }
        }

        for (domain_name, domain_entries) in entries {
            let Some(domain) = domains.get(&domain_name) else {
                continue;
            };
            let store = self
                .by_domain
                .entry(domain_name)
                .or_insert_with(|| domain.initial_inventory());
            domain.add_entries(store, domain_entries);
        }

        debug!(
            "intersphinx: {} inventories registered across {} domains",
            self.names.len(),
            self.by_domain.len()
        );
    }

    /// Persist the fetched inventories.
    pub fn save_cache(&self, path: &Path) -> Result<(), BuildError> {
        let data = serde_json::to_vec(&self.cache)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, data)?;
        Ok(())
    }

    /// Restore previously persisted inventories and rebuild the indexes.
    /// Returns `false` when no cache file exists.
    pub fn load_cache(&mut self, path: &Path, domains: &DomainRegistry) -> Result<bool, BuildError> {
        if !path.exists() {
            return Ok(false);
        }
        let data = fs::read(path)?;
        self.cache = serde_json::from_slice(&data)?;
        info!(
            "loaded {} cached intersphinx inventories from {}",
            self.cache.len(),
            path.display()
        );
        self.rebuild(domains);
        Ok(true)
    }

    /// Item set for `(domain, objtype, name)`, mainly for inspection
    pub fn lookup(&self, domain: &str, objtype: &str, name: &str) -> Option<&InventoryItemSet> {
        self.by_domain.get(domain)?.get(objtype, name)
    }
}
