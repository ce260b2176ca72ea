//! Cross-reference roles.
//!
//! Turns role text such as ``:py:func:`title <target>` `` into pending
//! cross-references, and provides the `external:` / `external+inv:` roles
//! that tag their references for intersphinx resolution.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::domains::{Domain, XRefRole, ANY_ROLE};
use crate::environment::BuildEnvironment;
use crate::error::{BuildWarning, WarningKind};
use crate::nodes::{Node, PendingXref, TextElement};

lazy_static! {
    /// `title <target>`
    static ref EXPLICIT_TITLE_REGEX: Regex = Regex::new(r"(?s)^(.+?)\s*<(.*?)>$").unwrap();

    /// Remainder of an external role name after `external`:
    /// optional `+inventory`, then `:` and the `domain:role` or `role` part
    static ref INVENTORY_REF_REGEX: Regex = Regex::new(r"^(\+([^:]+))?:(.*)$").unwrap();

    /// Inline role occurrence, e.g. :external+python:py:class:`str`
    static ref ROLE_REGEX: Regex =
        Regex::new(r":([A-Za-z][\w.+-]*(?::[\w.+-]+)*):`([^`]+)`").unwrap();
}

const EXTERNAL_PREFIX: &str = "external";

/// Split `title <target>` into `(has_explicit_title, title, target)`.
pub fn split_explicit_title(text: &str) -> (bool, String, String) {
    match EXPLICIT_TITLE_REGEX.captures(text) {
        Some(caps) => (true, caps[1].to_string(), caps[2].to_string()),
        None => (false, text.to_string(), text.to_string()),
    }
}

fn content_node(role: XRefRole, text: &str) -> TextElement {
    if role.literal {
        TextElement::literal(text)
    } else {
        TextElement::inline(text)
    }
}

/// Normalize `()` on function-like references: the title always gets one
/// pair, the target none.
fn update_title_and_target(
    has_explicit_title: bool,
    mut title: String,
    mut target: String,
) -> (String, String) {
    if !has_explicit_title {
        if let Some(stripped) = title.strip_suffix("()") {
            title = stripped.to_string();
        }
        title.push_str("()");
    }
    if let Some(stripped) = target.strip_suffix("()") {
        target = stripped.to_string();
    }
    (title, target)
}

/// Run a domain cross-reference role.
///
/// A leading `!` suppresses the link and yields plain content.
pub fn run_xref_role(
    env: &BuildEnvironment,
    domain: &dyn Domain,
    role_name: &str,
    role: XRefRole,
    text: &str,
    lineno: Option<usize>,
) -> Vec<Node> {
    if let Some(rest) = text.strip_prefix('!') {
        let mut title = rest.to_string();
        if role.fix_parens {
            title = update_title_and_target(false, title, String::new()).0;
        }
        return vec![Node::Text(content_node(role, &title))];
    }

    let (has_explicit_title, mut title, mut target) = split_explicit_title(text);
    if role.lowercase {
        target = target.to_lowercase();
    }
    if role.fix_parens {
        (title, target) = update_title_and_target(has_explicit_title, title, target);
    }
    let (title, target) = domain.process_link(has_explicit_title, title, target);

    let xref = PendingXref::new(
        Some(domain.name()),
        role_name,
        target,
        content_node(role, &title),
    )
    .explicit(has_explicit_title)
    .in_document(env.docname(), lineno);
    vec![Node::PendingXref(xref)]
}

/// Role lookup for ordinary roles: `domain:role` in that domain, a bare
/// `role` in the default domain and then in `std`.
pub fn lookup_role<'e>(
    env: &'e BuildEnvironment,
    name: &str,
) -> Option<(&'e dyn Domain, String, XRefRole)> {
    match name.split_once(':') {
        Some((domain_name, role_name)) => {
            let domain = env.domain(domain_name)?;
            let role = domain.role(role_name)?;
            Some((domain, role_name.to_string(), role))
        }
        None => {
            if let Some(domain) = env.default_domain() {
                if let Some(role) = domain.role(name) {
                    return Some((domain, name.to_string(), role));
                }
            }
            let std = env.domain("std")?;
            std.role(name).map(|role| (std, name.to_string(), role))
        }
    }
}

/// Hands out `IntersphinxRole`s for `external:` and `external+inv:` names.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntersphinxDispatcher;

impl IntersphinxDispatcher {
    /// `None` means the name is not an external role and normal role
    /// lookup applies.
    pub fn role(&self, role_name: &str) -> Option<IntersphinxRole> {
        let is_external =
            role_name.starts_with("external:") || role_name.starts_with("external+");
        if role_name.len() > 9 && is_external {
            Some(IntersphinxRole::new(role_name))
        } else {
            None
        }
    }
}

/// The `external[+inv]:[domain:]role` role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntersphinxRole {
    orig_name: String,
}

impl IntersphinxRole {
    pub fn new(orig_name: &str) -> Self {
        Self {
            orig_name: orig_name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.orig_name
    }

    /// `(inventory, domain:role suffix)`, `None` if the name does not parse.
    pub fn inventory_and_name_suffix(&self) -> Option<(Option<String>, String)> {
        let rest = self.orig_name.get(EXTERNAL_PREFIX.len()..)?;
        let caps = INVENTORY_REF_REGEX.captures(rest)?;
        Some((
            caps.get(2).map(|m| m.as_str().to_string()),
            caps[3].to_string(),
        ))
    }

    /// Resolve `role` or `domain:role` to a concrete role, falling back to
    /// the standard domain.
    pub fn role_name<'e>(
        &self,
        env: &'e BuildEnvironment,
        name: &str,
    ) -> Option<(&'e dyn Domain, String, XRefRole)> {
        let names: Vec<&str> = name.split(':').collect();
        let (domain, role_name): (Option<&dyn Domain>, &str) = match names.as_slice() {
            [role_name] => (env.default_domain(), *role_name),
            [domain_name, role_name] => (env.domain(domain_name), *role_name),
            _ => return None,
        };

        if let Some(domain) = domain {
            if let Some(role) = domain.role(role_name) {
                return Some((domain, role_name.to_string(), role));
            }
        }
        let std = env.domain("std")?;
        std.role(role_name)
            .map(|role| (std, role_name.to_string(), role))
    }

    /// Run the role. Problems are reported as warnings and produce no nodes.
    pub fn run(&self, env: &BuildEnvironment, text: &str, lineno: Option<usize>) -> Vec<Node> {
        let Some((inventory, name_suffix)) = self.inventory_and_name_suffix() else {
            env.warn(
                BuildWarning::new(
                    WarningKind::UnknownRole,
                    format!(
                        "role for external cross-reference not found: {}",
                        &self.orig_name
                    ),
                )
                .at(env.docname(), lineno),
            );
            return Vec::new();
        };

        if let Some(inv) = inventory.as_deref() {
            if !env.inventory_exists(inv) {
                env.warn(
                    BuildWarning::new(
                        WarningKind::UnknownInventory,
                        format!("inventory for external cross-reference not found: {}", inv),
                    )
                    .at(env.docname(), lineno),
                );
                return Vec::new();
            }
        }

        let Some((domain, role_name, role)) = self.role_name(env, &name_suffix) else {
            env.warn(
                BuildWarning::new(
                    WarningKind::UnknownRole,
                    format!("role for external cross-reference not found: {}", name_suffix),
                )
                .at(env.docname(), lineno),
            );
            return Vec::new();
        };

        let mut nodes = run_xref_role(env, domain, &role_name, role, text, lineno);
        for node in &mut nodes {
            if let Node::PendingXref(xref) = node {
                xref.mark_intersphinx(inventory.as_deref());
            }
        }
        nodes
    }
}

/// Run any role by name. `None` for roles nobody defines.
pub fn run_role(
    env: &BuildEnvironment,
    name: &str,
    text: &str,
    lineno: Option<usize>,
) -> Option<Vec<Node>> {
    if let Some(role) = IntersphinxDispatcher.role(name) {
        return Some(role.run(env, text, lineno));
    }
    if name == ANY_ROLE {
        let (has_explicit_title, title, target) = split_explicit_title(text);
        let xref = PendingXref::new(None, ANY_ROLE, target, TextElement::literal(title))
            .explicit(has_explicit_title)
            .in_document(env.docname(), lineno);
        return Some(vec![Node::PendingXref(xref)]);
    }
    let (domain, role_name, role) = lookup_role(env, name)?;
    Some(run_xref_role(env, domain, &role_name, role, text, lineno))
}

/// One role occurrence found in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOccurrence {
    pub name: String,
    pub text: String,
    /// 1-based line of the occurrence
    pub lineno: usize,
}

/// Find every inline role in `content`.
pub fn scan_roles(content: &str) -> Vec<RoleOccurrence> {
    ROLE_REGEX
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(RoleOccurrence {
                name: caps[1].to_string(),
                text: caps[2].to_string(),
                lineno: content[..whole.start()].matches('\n').count() + 1,
            })
        })
        .collect()
}

/// Split `content` into text and the nodes its roles produce. Unknown
/// roles are kept as text.
pub fn read_inline(env: &BuildEnvironment, content: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut last = 0;
    for caps in ROLE_REGEX.captures_iter(content) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            nodes.push(Node::Text(TextElement::inline(&content[last..whole.start()])));
        }
        let lineno = content[..whole.start()].matches('\n').count() + 1;
        match run_role(env, &caps[1], &caps[2], Some(lineno)) {
            Some(produced) => nodes.extend(produced),
            None => {
                debug!("unknown role {:?} left as text", &caps[1]);
                nodes.push(Node::Text(TextElement::inline(whole.as_str())));
            }
        }
        last = whole.end();
    }
    if last < content.len() {
        nodes.push(Node::Text(TextElement::inline(&content[last..])));
    }
    nodes
}
