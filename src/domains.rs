/// Domain System for Intersphinx Lookups
///
/// A domain is a pluggable namespace (one per language or markup) that
/// defines its object types, the roles that reference them, and how
/// inventory entries for its objects are indexed and looked up. Domains are
/// kept in a registry ordered by registration, which is also the order
/// `any` references try them in.
pub mod python;
pub mod rst;
pub mod standard;

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::BuildError;
use crate::inventory::InventoryItemSet;

pub use python::PythonDomain;
pub use rst::RstDomain;
pub use standard::StandardDomain;

/// Reference type that searches every object type of every domain
pub const ANY_ROLE: &str = "any";

/// An object type and the roles that may reference it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjType {
    pub name: &'static str,
    pub roles: &'static [&'static str],
}

impl ObjType {
    pub const fn new(name: &'static str, roles: &'static [&'static str]) -> Self {
        Self { name, roles }
    }
}

/// How a cross-reference role builds its pending reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XRefRole {
    /// Lowercase the target
    pub lowercase: bool,
    /// Render content as code rather than plain text
    pub literal: bool,
    /// Normalize trailing `()` on function-like targets
    pub fix_parens: bool,
}

impl XRefRole {
    pub const fn literal() -> Self {
        Self {
            lowercase: false,
            literal: true,
            fix_parens: false,
        }
    }

    pub const fn inline() -> Self {
        Self {
            lowercase: false,
            literal: false,
            fix_parens: false,
        }
    }

    pub const fn lowercased(mut self) -> Self {
        self.lowercase = true;
        self
    }

    pub const fn with_parens(mut self) -> Self {
        self.fix_parens = true;
        self
    }
}

/// Per-domain index of loaded inventory entries: objtype -> name -> item set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainInventory {
    objects: HashMap<String, HashMap<String, InventoryItemSet>>,
}

impl DomainInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with an empty table for each given object type
    pub fn with_object_types(objtypes: &[ObjType]) -> Self {
        let objects = objtypes
            .iter()
            .map(|objtype| (objtype.name.to_string(), HashMap::new()))
            .collect();
        Self { objects }
    }

    pub fn get(&self, objtype: &str, name: &str) -> Option<&InventoryItemSet> {
        self.objects.get(objtype).and_then(|names| names.get(name))
    }

    /// Item set for `(objtype, name)`, created empty if missing
    pub fn entry(&mut self, objtype: &str, name: &str) -> &mut InventoryItemSet {
        self.objects
            .entry(objtype.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default()
    }

    pub fn object_types(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn objects(&self, objtype: &str) -> Option<&HashMap<String, InventoryItemSet>> {
        self.objects.get(objtype)
    }

    /// Number of distinct `(objtype, name)` pairs
    pub fn len(&self) -> usize {
        self.objects.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append every item set of `other` to this store
    pub fn merge(&mut self, other: DomainInventory) {
        for (objtype, names) in other.objects {
            let target = self.objects.entry(objtype).or_default();
            for (name, set) in names {
                target.entry(name).or_default().extend(set);
            }
        }
    }

    pub fn into_objects(self) -> HashMap<String, HashMap<String, InventoryItemSet>> {
        self.objects
    }
}

/// Capability interface every domain provides to the intersphinx core
pub trait Domain: Send + Sync {
    /// Short name used in inventories and roles (`py`, `std`, ...)
    fn name(&self) -> &str;

    /// Human-readable name
    fn label(&self) -> &str;

    fn object_types(&self) -> &[ObjType];

    /// Look up a cross-reference role by name
    fn role(&self, name: &str) -> Option<XRefRole>;

    fn has_role(&self, name: &str) -> bool {
        self.role(name).is_some()
    }

    /// Role-specific rewriting of `(title, target)` after explicit-title parsing
    fn process_link(
        &self,
        _has_explicit_title: bool,
        title: String,
        target: String,
    ) -> (String, String) {
        (title, target)
    }

    /// Fresh store used after every `clear`
    fn initial_inventory(&self) -> DomainInventory {
        DomainInventory::new()
    }

    /// Insert freshly grouped entries into this domain's store
    fn add_entries(&self, store: &mut DomainInventory, entries: DomainInventory) {
        store.merge(entries);
    }

    /// Object types a role can reference; `any` covers all of them
    fn objtypes_for_role(&self, role: &str) -> Vec<&'static str> {
        self.object_types()
            .iter()
            .filter(|objtype| role == ANY_ROLE || objtype.roles.iter().any(|r| *r == role))
            .map(|objtype| objtype.name)
            .collect()
    }

    /// Find the item set a `(reftype, target)` reference points at, skipping
    /// the object types listed in `disabled`
    fn resolve_xref(
        &self,
        store: &DomainInventory,
        reftype: &str,
        target: &str,
        disabled: &[String],
    ) -> Option<InventoryItemSet> {
        self.objtypes_for_role(reftype)
            .into_iter()
            .filter(|objtype| !disabled.iter().any(|d| d.as_str() == *objtype))
            .find_map(|objtype| store.get(objtype, target))
            .cloned()
    }
}

/// Registry of domains, ordered by registration
pub struct DomainRegistry {
    domains: IndexMap<String, Box<dyn Domain>>,
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            domains: IndexMap::new(),
        }
    }

    /// Registry with the `std`, `py` and `rst` domains
    pub fn with_builtin_domains() -> Self {
        let mut registry = Self::new();
        registry.domains.insert(
            "std".to_string(),
            Box::new(StandardDomain::new()) as Box<dyn Domain>,
        );
        registry
            .domains
            .insert("py".to_string(), Box::new(PythonDomain::new()));
        registry
            .domains
            .insert("rst".to_string(), Box::new(RstDomain::new()));
        registry
    }

    /// Register a domain
    pub fn register_domain(&mut self, domain: Box<dyn Domain>) -> Result<(), BuildError> {
        let domain_name = domain.name().to_string();

        if self.domains.contains_key(&domain_name) {
            return Err(BuildError::DuplicateDomain(domain_name));
        }

        self.domains.insert(domain_name, domain);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Domain> {
        self.domains.get(name).map(|domain| domain.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.domains.contains_key(name)
    }

    /// Domains in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Domain> {
        self.domains.values().map(|domain| domain.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
