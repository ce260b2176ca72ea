use crate::domains::{Domain, ObjType, XRefRole};
/// reStructuredText Domain Implementation
///
/// Handles references to directives and roles documented by other projects,
/// like :rst:dir:`code-block` and :rst:role:`ref`.

const OBJECT_TYPES: &[ObjType] = &[
    ObjType::new("directive", &["dir"]),
    ObjType::new("directive:option", &["dir"]),
    ObjType::new("role", &["role"]),
];

/// reStructuredText domain (`rst`)
#[derive(Debug, Default)]
pub struct RstDomain;

impl RstDomain {
    /// Create a new reST domain
    pub fn new() -> Self {
        Self
    }
}

impl Domain for RstDomain {
    fn name(&self) -> &str {
        "rst"
    }

    fn label(&self) -> &str {
        "reStructuredText"
    }

    fn object_types(&self) -> &[ObjType] {
        OBJECT_TYPES
    }

    fn role(&self, name: &str) -> Option<XRefRole> {
        match name {
            "dir" | "role" => Some(XRefRole::literal()),
            _ => None,
        }
    }
}
