//! Same-named objects contributed by several inventories.

use std::fmt;

use crate::error::ResolveError;
use crate::inventory::InventoryItem;
use crate::nodes::{PendingXref, Reference};

/// Display name meaning "same as the target".
pub const NO_DISPLAY_NAME: &str = "-";

/// Ordered `(inventory name, item)` pairs sharing one fully-qualified name.
///
/// At most one pair may come from the unnamed (legacy) inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryItemSet {
    items: Vec<(Option<String>, InventoryItem)>,
}

impl InventoryItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, inv_name: Option<String>, item: InventoryItem) {
        self.items.push((inv_name, item));
    }

    pub fn extend(&mut self, other: InventoryItemSet) {
        self.items.extend(other.items);
    }

    /// Whether `inv_name` already contributes an entry
    pub fn contains_inventory(&self, inv_name: Option<&str>) -> bool {
        self.items.iter().any(|(name, _)| name.as_deref() == inv_name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &InventoryItem)> {
        self.items.iter().map(|(name, item)| (name.as_deref(), item))
    }

    /// Restrict to one inventory. `None` keeps every entry; a name that
    /// contributes nothing yields `None`.
    pub fn select_inventory(&self, inv_name: Option<&str>) -> Option<InventoryItemSet> {
        let Some(inv_name) = inv_name else {
            return Some(self.clone());
        };
        let items: Vec<_> = self
            .items
            .iter()
            .filter(|(name, _)| name.as_deref() == Some(inv_name))
            .cloned()
            .collect();
        if items.is_empty() {
            None
        } else {
            Some(InventoryItemSet { items })
        }
    }

    /// The entry a reference links to: the unnamed one if present, otherwise
    /// the one whose inventory name sorts first.
    pub fn preferred(&self) -> Option<(Option<&str>, &InventoryItem)> {
        let mut unnamed = self.items.iter().filter(|(name, _)| name.is_none());
        if let Some((_, item)) = unnamed.next() {
            assert!(
                unnamed.next().is_none(),
                "inventory item set holds more than one unnamed entry"
            );
            return Some((None, item));
        }
        self.items
            .iter()
            .filter_map(|(name, item)| name.as_deref().map(|n| (n, item)))
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(name, item)| (Some(name), item))
    }

    /// Build the link node for `xref`.
    ///
    /// `target` is the target actually looked up; it differs from
    /// `xref.reftarget` when an `inv:target` prefix was split off.
    pub fn make_reference_node(
        &self,
        domain_name: &str,
        xref: &PendingXref,
        target: &str,
    ) -> Result<Reference, ResolveError> {
        let (inv_name, item) = self.preferred().ok_or(ResolveError::EmptyItemSet)?;
        if item.uri.is_empty() {
            return Err(ResolveError::EmptyUri(target.to_string()));
        }

        let mut uri = item.uri.clone();
        if !uri.contains("://") && !uri.starts_with('/') {
            if let Some(refdoc) = xref.refdoc.as_deref() {
                uri = format!("{}{}", relative_prefix(refdoc), uri);
            }
        }

        let reftitle = if item.project_version.is_empty() {
            format!("(in {})", item.project_name)
        } else {
            format!("(in {} v{})", item.project_name, item.project_version)
        };

        let contnode = &xref.content;
        let children = if xref.refexplicit {
            vec![contnode.clone()]
        } else if item.display_name == NO_DISPLAY_NAME
            || (domain_name == "std" && xref.reftype == "keyword")
        {
            let title = contnode.astext();
            let rewritten = target != xref.reftarget;
            let stripped = inv_name
                .filter(|_| rewritten)
                .and_then(|name| title.strip_prefix(name))
                .and_then(|rest| rest.strip_prefix(':'));
            match stripped {
                Some(rest) => vec![contnode.with_text(rest)],
                None => vec![contnode.clone()],
            }
        } else {
            vec![contnode.with_text(item.display_name.as_str())]
        };

        Ok(Reference {
            refuri: uri,
            reftitle,
            internal: false,
            children,
        })
    }
}

/// `../` once per directory level of `docname`.
fn relative_prefix(docname: &str) -> String {
    "../".repeat(docname.matches('/').count())
}

impl fmt::Display for InventoryItemSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InventoryItemSet(")?;
        for (i, (name, item)) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({:?}, {})", name, item.uri)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::TextElement;

    fn item(project: &str, uri: &str, dispname: &str) -> InventoryItem {
        InventoryItem {
            project_name: project.to_string(),
            project_version: "1.0".to_string(),
            uri: uri.to_string(),
            display_name: dispname.to_string(),
        }
    }

    fn xref(reftype: &str, target: &str, text: &str) -> PendingXref {
        PendingXref::new(Some("py"), reftype, target, TextElement::literal(text))
    }

    #[test]
    fn test_unnamed_entry_wins() {
        let mut set = InventoryItemSet::new();
        set.append(Some("zeta".into()), item("Zeta", "https://z/e1", "-"));
        set.append(Some("alpha".into()), item("Alpha", "https://a/e2", "-"));
        set.append(None, item("Legacy", "https://l/e0", "-"));

        let (name, chosen) = set.preferred().unwrap();
        assert_eq!(name, None);
        assert_eq!(chosen.uri, "https://l/e0");
    }

    #[test]
    fn test_smallest_name_wins_without_unnamed() {
        let mut set = InventoryItemSet::new();
        set.append(Some("zeta".into()), item("Zeta", "https://z/e1", "-"));
        set.append(Some("alpha".into()), item("Alpha", "https://a/e2", "-"));

        let (name, chosen) = set.preferred().unwrap();
        assert_eq!(name, Some("alpha"));
        assert_eq!(chosen.uri, "https://a/e2");
    }

    #[test]
    #[should_panic(expected = "more than one unnamed entry")]
    fn test_two_unnamed_entries_panic() {
        let mut set = InventoryItemSet::new();
        set.append(None, item("A", "https://a", "-"));
        set.append(None, item("B", "https://b", "-"));
        set.preferred();
    }

    #[test]
    fn test_select_inventory() {
        let mut set = InventoryItemSet::new();
        set.append(Some("numpy".into()), item("NumPy", "https://n", "-"));
        set.append(Some("scipy".into()), item("SciPy", "https://s", "-"));

        assert_eq!(set.select_inventory(None).unwrap().len(), 2);
        assert_eq!(set.select_inventory(Some("scipy")).unwrap().len(), 1);
        assert!(set.select_inventory(Some("pandas")).is_none());
    }

    #[test]
    fn test_reference_title_with_and_without_version() {
        let mut set = InventoryItemSet::new();
        set.append(Some("py".into()), item("Python", "https://docs/x", "-"));
        let node = set
            .make_reference_node("py", &xref("func", "x", "x()"), "x")
            .unwrap();
        assert_eq!(node.reftitle, "(in Python v1.0)");
        assert!(!node.internal);

        let mut unversioned = item("Python", "https://docs/x", "-");
        unversioned.project_version.clear();
        let mut set = InventoryItemSet::new();
        set.append(Some("py".into()), unversioned);
        let node = set
            .make_reference_node("py", &xref("func", "x", "x()"), "x")
            .unwrap();
        assert_eq!(node.reftitle, "(in Python)");
    }

    #[test]
    fn test_display_name_used_for_labels() {
        let mut set = InventoryItemSet::new();
        set.append(
            Some("sphinx".into()),
            item("Sphinx", "https://s/intro.html#intro", "Introduction"),
        );
        let pending = PendingXref::new(Some("std"), "ref", "intro", TextElement::inline("intro"));
        let node = set.make_reference_node("std", &pending, "intro").unwrap();
        assert_eq!(node.children, vec![TextElement::inline("Introduction")]);
    }

    #[test]
    fn test_explicit_title_kept() {
        let mut set = InventoryItemSet::new();
        set.append(Some("sphinx".into()), item("Sphinx", "https://s/a", "Display"));
        let pending = PendingXref::new(Some("std"), "ref", "a", TextElement::inline("mine"))
            .explicit(true);
        let node = set.make_reference_node("std", &pending, "a").unwrap();
        assert_eq!(node.astext(), "mine");
    }

    #[test]
    fn test_inventory_prefix_stripped_after_rewrite() {
        let mut set = InventoryItemSet::new();
        set.append(Some("numpy".into()), item("NumPy", "https://n/nd", "-"));
        let pending = xref("class", "numpy:ndarray", "numpy:ndarray");

        let node = set.make_reference_node("py", &pending, "ndarray").unwrap();
        assert_eq!(node.children, vec![TextElement::literal("ndarray")]);

        // Not rewritten: the content stays as written.
        let node = set
            .make_reference_node("py", &pending, "numpy:ndarray")
            .unwrap();
        assert_eq!(node.astext(), "numpy:ndarray");
    }

    #[test]
    fn test_local_uri_relative_to_referring_document() {
        let mut set = InventoryItemSet::new();
        set.append(None, item("Local", "other/api.html#f", "-"));
        let pending = xref("func", "f", "f()").in_document(Some("guide/usage/intro"), Some(3));
        let node = set.make_reference_node("py", &pending, "f").unwrap();
        assert_eq!(node.refuri, "../../other/api.html#f");
    }

    #[test]
    fn test_empty_set_and_empty_uri_fail() {
        let set = InventoryItemSet::new();
        assert_eq!(
            set.make_reference_node("py", &xref("func", "f", "f"), "f"),
            Err(ResolveError::EmptyItemSet)
        );

        let mut set = InventoryItemSet::new();
        set.append(None, item("Broken", "", "-"));
        assert_eq!(
            set.make_reference_node("py", &xref("func", "f", "f"), "f"),
            Err(ResolveError::EmptyUri("f".to_string()))
        );
    }
}
