//! Minimal document node model shared by the role layer and the resolver.
//!
//! Only the nodes the cross-reference protocol touches are modelled: text
//! content, the pending cross-reference placeholder, and the resolved link.

/// Rendering class of a piece of text content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// Plain inline text (`:ref:`, `:doc:`, `:term:` content)
    Inline,
    /// Code-styled text (most object roles)
    Literal,
}

/// A text-carrying element, the content of a cross-reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextElement {
    pub kind: TextKind,
    pub text: String,
}

impl TextElement {
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            kind: TextKind::Inline,
            text: text.into(),
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            kind: TextKind::Literal,
            text: text.into(),
        }
    }

    /// New element of the same kind carrying different text
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            kind: self.kind,
            text: text.into(),
        }
    }

    pub fn astext(&self) -> &str {
        &self.text
    }
}

/// An unresolved cross-reference produced while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingXref {
    /// Domain of the role that produced it (`py`, `std`, ...)
    pub refdomain: Option<String>,
    /// Role name, or `any`
    pub reftype: String,
    /// Target as written (after role-specific processing)
    pub reftarget: String,
    /// Whether the author supplied `title <target>`
    pub refexplicit: bool,
    /// Document the reference appears in
    pub refdoc: Option<String>,
    pub lineno: Option<usize>,
    /// Content shown when the reference is rendered
    pub content: TextElement,
    /// Set by the `external:` role dispatcher
    pub intersphinx: bool,
    /// Explicit inventory restriction from `external+inv:`
    pub inventory: Option<String>,
}

impl PendingXref {
    pub fn new(
        refdomain: Option<&str>,
        reftype: impl Into<String>,
        reftarget: impl Into<String>,
        content: TextElement,
    ) -> Self {
        Self {
            refdomain: refdomain.map(str::to_string),
            reftype: reftype.into(),
            reftarget: reftarget.into(),
            refexplicit: false,
            refdoc: None,
            lineno: None,
            content,
            intersphinx: false,
            inventory: None,
        }
    }

    pub fn explicit(mut self, refexplicit: bool) -> Self {
        self.refexplicit = refexplicit;
        self
    }

    pub fn in_document(mut self, docname: Option<&str>, lineno: Option<usize>) -> Self {
        self.refdoc = docname.map(str::to_string);
        self.lineno = lineno;
        self
    }

    /// Tag as an intersphinx reference, optionally restricted to one inventory
    pub fn mark_intersphinx(&mut self, inventory: Option<&str>) {
        self.intersphinx = true;
        self.inventory = inventory.map(str::to_string);
    }
}

/// A resolved external link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub refuri: String,
    pub reftitle: String,
    pub internal: bool,
    pub children: Vec<TextElement>,
}

impl Reference {
    pub fn astext(&self) -> String {
        self.children.iter().map(|c| c.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(TextElement),
    PendingXref(PendingXref),
    Reference(Reference),
}

impl Node {
    pub fn astext(&self) -> String {
        match self {
            Node::Text(text) => text.text.clone(),
            Node::PendingXref(xref) => xref.content.text.clone(),
            Node::Reference(reference) => reference.astext(),
        }
    }

    pub fn as_pending_xref(&self) -> Option<&PendingXref> {
        match self {
            Node::PendingXref(xref) => Some(xref),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Node::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}
