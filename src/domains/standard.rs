use crate::domains::{Domain, DomainInventory, ObjType, XRefRole};
use crate::inventory::InventoryItemSet;
/// Standard Domain Implementation
///
/// Handles the language-independent objects every Sphinx project has:
/// documents, section labels, glossary terms, options and environment
/// variables. Labels and terms are matched case-insensitively.

const OBJECT_TYPES: &[ObjType] = &[
    ObjType::new("term", &["term"]),
    ObjType::new("token", &["token"]),
    ObjType::new("label", &["ref", "keyword", "numref"]),
    ObjType::new("envvar", &["envvar"]),
    ObjType::new("cmdoption", &["option"]),
    ObjType::new("doc", &["doc"]),
];

/// Object types whose names are stored and looked up lowercased
const CASE_INSENSITIVE: &[&str] = &["label", "term"];

/// Standard domain (`std`)
#[derive(Debug, Default)]
pub struct StandardDomain;

impl StandardDomain {
    /// Create a new standard domain
    pub fn new() -> Self {
        Self
    }
}

impl Domain for StandardDomain {
    fn name(&self) -> &str {
        "std"
    }

    fn label(&self) -> &str {
        "Default"
    }

    fn object_types(&self) -> &[ObjType] {
        OBJECT_TYPES
    }

    fn role(&self, name: &str) -> Option<XRefRole> {
        match name {
            "envvar" | "token" | "keyword" | "option" => Some(XRefRole::literal()),
            "term" | "ref" | "numref" => Some(XRefRole::inline().lowercased()),
            "doc" => Some(XRefRole::inline()),
            _ => None,
        }
    }

    fn initial_inventory(&self) -> DomainInventory {
        DomainInventory::with_object_types(OBJECT_TYPES)
    }

    fn add_entries(&self, store: &mut DomainInventory, entries: DomainInventory) {
        for (objtype, names) in entries.into_objects() {
            if !CASE_INSENSITIVE.contains(&objtype.as_str()) {
                for (name, set) in names {
                    store.entry(&objtype, &name).extend(set);
                }
                continue;
            }
            // case variants collapse onto one key; each inventory keeps the
            // variant whose original name sorts first
            let mut names: Vec<_> = names.into_iter().collect();
            names.sort_by(|a, b| a.0.cmp(&b.0));
            for (name, set) in names {
                let folded = store.entry(&objtype, &name.to_lowercase());
                for (inv_name, item) in set.iter() {
                    if !folded.contains_inventory(inv_name) {
                        folded.append(inv_name.map(str::to_string), item.clone());
                    }
                }
            }
        }
    }

    fn resolve_xref(
        &self,
        store: &DomainInventory,
        reftype: &str,
        target: &str,
        disabled: &[String],
    ) -> Option<InventoryItemSet> {
        let folded = target.to_lowercase();
        self.objtypes_for_role(reftype)
            .into_iter()
            .filter(|objtype| !disabled.iter().any(|d| d.as_str() == *objtype))
            .find_map(|objtype| {
                let key = if CASE_INSENSITIVE.contains(&objtype) {
                    folded.as_str()
                } else {
                    target
                };
                store.get(objtype, key)
            })
            .cloned()
    }
}
