//! Resolution of pending cross-references against loaded inventories.
//!
//! Two entry points exist. References tagged by the `external:` roles are
//! resolved by `IntersphinxRoleResolver` and warn when missing; ordinary
//! references that the local project could not resolve go through
//! `missing_reference`, which also understands `inv:target` targets.

use log::debug;

use crate::domains::{Domain, ANY_ROLE};
use crate::environment::BuildEnvironment;
use crate::error::{BuildWarning, WarningKind};
use crate::nodes::{Node, PendingXref, Reference};

fn resolve_in_domain(
    env: &BuildEnvironment,
    inv_name: Option<&str>,
    honor_disabled_refs: bool,
    domain: &dyn Domain,
    xref: &PendingXref,
    target: &str,
) -> Option<Reference> {
    let state = env.intersphinx();
    let disabled: &[String] = if honor_disabled_refs {
        state.disabled().disabled_objtypes_in_domain(domain.name())
    } else {
        &[]
    };

    let store = state.domain_inventory(domain.name())?;
    let inv_set = domain.resolve_xref(store, &xref.reftype, target, disabled)?;
    let restricted = inv_set.select_inventory(inv_name)?;
    match restricted.make_reference_node(domain.name(), xref, target) {
        Ok(reference) => Some(reference),
        Err(err) => {
            debug!("intersphinx: cannot link {}: {}", target, err);
            None
        }
    }
}

fn resolve(
    env: &BuildEnvironment,
    inv_name: Option<&str>,
    honor_disabled_refs: bool,
    xref: &PendingXref,
    target: &str,
) -> Option<Reference> {
    // disabling only applies when no inventory is given
    let honor = honor_disabled_refs && inv_name.is_none();
    let disabled = env.intersphinx().disabled();

    if honor && disabled.all_objtypes_disabled() {
        return None;
    }

    if xref.reftype == ANY_ROLE {
        return env
            .domains()
            .iter()
            .filter(|domain| !(honor && disabled.all_domain_objtypes_disabled(domain.name())))
            .find_map(|domain| resolve_in_domain(env, inv_name, honor, domain, xref, target));
    }

    // only objects in domains are in the inventory
    let domain_name = xref.refdomain.as_deref().filter(|name| !name.is_empty())?;
    if honor && disabled.all_domain_objtypes_disabled(domain_name) {
        return None;
    }
    let Some(domain) = env.domain(domain_name) else {
        debug!("intersphinx: unknown domain {:?}", domain_name);
        return None;
    };
    resolve_in_domain(env, inv_name, honor, domain, xref, target)
}

pub fn inventory_exists(env: &BuildEnvironment, inv_name: &str) -> bool {
    env.inventory_exists(inv_name)
}

/// Resolve in one inventory with the target as is. Disabled reference
/// types do not apply.
///
/// # Panics
///
/// If `inv_name` is not a registered inventory.
pub fn resolve_reference_in_inventory(
    env: &BuildEnvironment,
    inv_name: &str,
    xref: &PendingXref,
) -> Option<Reference> {
    assert!(
        inventory_exists(env, inv_name),
        "intersphinx inventory {:?} is not registered",
        inv_name
    );
    resolve(env, Some(inv_name), false, xref, &xref.reftarget)
}

/// Resolve in any inventory with the target as is.
pub fn resolve_reference_any_inventory(
    env: &BuildEnvironment,
    honor_disabled_refs: bool,
    xref: &PendingXref,
) -> Option<Reference> {
    resolve(env, None, honor_disabled_refs, xref, &xref.reftarget)
}

/// Resolve in any inventory; failing that, read the target as
/// `inv_name:target` and resolve in that inventory if it exists.
pub fn resolve_reference_detect_inventory(
    env: &BuildEnvironment,
    xref: &PendingXref,
) -> Option<Reference> {
    if let Some(reference) = resolve_reference_any_inventory(env, true, xref) {
        return Some(reference);
    }

    let (inv_name, new_target) = xref.reftarget.split_once(':')?;
    if !inventory_exists(env, inv_name) {
        return None;
    }
    resolve(env, Some(inv_name), false, xref, new_target)
}

/// Fallback for references the project itself could not resolve.
pub fn missing_reference(env: &BuildEnvironment, xref: &PendingXref) -> Option<Reference> {
    resolve_reference_detect_inventory(env, xref)
}

/// Counts from one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub resolved: usize,
    pub unresolved: usize,
}

/// Resolves the references produced by the `external:` roles.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntersphinxRoleResolver;

impl IntersphinxRoleResolver {
    /// Replace every tagged pending xref in `nodes` with its link, or with
    /// its content plus a warning when no inventory has the target.
    pub fn run(&self, env: &BuildEnvironment, nodes: &mut [Node]) -> ResolutionStats {
        let mut stats = ResolutionStats::default();
        for node in nodes.iter_mut() {
            let Node::PendingXref(xref) = node else {
                continue;
            };
            if !xref.intersphinx {
                continue;
            }

            let resolved = match xref.inventory.as_deref() {
                Some(inv_name) => resolve_reference_in_inventory(env, inv_name, xref),
                None => resolve_reference_any_inventory(env, false, xref),
            };
            *node = match resolved {
                Some(reference) => {
                    stats.resolved += 1;
                    Node::Reference(reference)
                }
                None => {
                    stats.unresolved += 1;
                    env.warn(
                        BuildWarning::new(
                            WarningKind::UnresolvedReference,
                            format!(
                                "external {}:{} reference target not found: {}",
                                xref.refdomain.as_deref().unwrap_or_default(),
                                xref.reftype,
                                xref.reftarget
                            ),
                        )
                        .at(xref.refdoc.as_deref(), xref.lineno),
                    );
                    Node::Text(xref.content.clone())
                }
            };
        }
        stats
    }
}

/// Resolve every pending xref in `nodes`: tagged ones first, then the
/// remaining ones through `missing_reference`. Untagged misses keep their
/// content without a warning.
pub fn resolve_pending_references(env: &BuildEnvironment, nodes: &mut [Node]) -> ResolutionStats {
    let mut stats = IntersphinxRoleResolver.run(env, nodes);
    for node in nodes.iter_mut() {
        let Node::PendingXref(xref) = node else {
            continue;
        };
        *node = match missing_reference(env, xref) {
            Some(reference) => {
                stats.resolved += 1;
                Node::Reference(reference)
            }
            None => {
                stats.unresolved += 1;
                debug!(
                    "unresolved reference {}:{} {:?}",
                    xref.refdomain.as_deref().unwrap_or_default(),
                    xref.reftype,
                    xref.reftarget
                );
                Node::Text(xref.content.clone())
            }
        };
    }
    stats
}
