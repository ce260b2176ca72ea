//! Error and warning types shared across the crate.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while decoding an inventory file.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("invalid inventory header: {0}")]
    UnsupportedFormat(String),

    #[error("invalid inventory header (not compressed): {0}")]
    NotCompressed(String),

    #[error("malformed inventory line: {0:?}")]
    MalformedLine(String),

    #[error("inventory contains invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-candidate failure of the fetcher. Never escapes a fetch group.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("intersphinx inventory {inv:?} not fetchable due to {kind}: {message}")]
    NotFetchable {
        inv: String,
        kind: &'static str,
        message: String,
    },

    #[error("intersphinx inventory {inv:?} not readable due to {kind}: {message}")]
    NotReadable {
        inv: String,
        kind: &'static str,
        message: String,
    },
}

impl FetchError {
    pub(crate) fn not_readable(inv: &str, err: &InventoryError) -> Self {
        let kind = match err {
            InventoryError::UnsupportedFormat(_) | InventoryError::NotCompressed(_) => {
                "unknown or unsupported inventory version"
            }
            InventoryError::MalformedLine(_) => "malformed inventory",
            InventoryError::Utf8(_) => "invalid encoding",
            InventoryError::Io(_) => "I/O error",
        };
        FetchError::NotReadable {
            inv: inv.to_string(),
            kind,
            message: err.to_string(),
        }
    }
}

/// Reasons an item set could not be turned into a reference node.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no inventory entries to build a reference from")]
    EmptyItemSet,

    #[error("inventory entry for {0:?} has an empty URI")]
    EmptyUri(String),
}

/// Build-level errors surfaced to the caller.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Domain '{0}' is already registered")]
    DuplicateDomain(String),

    #[error("Configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("{0} warning(s) raised while warnings are treated as errors")]
    WarningsAsErrors(usize),

    #[error("Cache serialization error: {0}")]
    Cache(#[from] serde_json::Error),

    #[error("Failed to start fetch workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Category of a recorded warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Every candidate of a mapping entry failed
    InventoryUnreachable,
    /// `external+inv:` named an inventory that is not loaded
    UnknownInventory,
    /// `external:...` named a role no domain defines
    UnknownRole,
    /// An external reference could not be resolved
    UnresolvedReference,
}

/// A warning collected during the build, in addition to being logged.
#[derive(Debug, Clone)]
pub struct BuildWarning {
    pub kind: WarningKind,
    pub message: String,
    pub docname: Option<String>,
    pub lineno: Option<usize>,
}

impl BuildWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            docname: None,
            lineno: None,
        }
    }

    pub fn at(mut self, docname: Option<&str>, lineno: Option<usize>) -> Self {
        self.docname = docname.map(str::to_string);
        self.lineno = lineno;
        self
    }
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.docname, self.lineno) {
            (Some(doc), Some(line)) => write!(f, "{}:{}: WARNING: {}", doc, line, self.message),
            (Some(doc), None) => write!(f, "{}: WARNING: {}", doc, self.message),
            _ => write!(f, "WARNING: {}", self.message),
        }
    }
}
