use crate::domains::{Domain, ObjType, XRefRole};
/// Python Domain Implementation
///
/// Handles Python objects and references like :func:, :class:, :mod:, etc.

const OBJECT_TYPES: &[ObjType] = &[
    ObjType::new("function", &["func", "obj"]),
    ObjType::new("data", &["data", "obj"]),
    ObjType::new("class", &["class", "exc", "obj"]),
    ObjType::new("exception", &["exc", "class", "obj"]),
    ObjType::new("method", &["meth", "obj"]),
    ObjType::new("classmethod", &["meth", "obj"]),
    ObjType::new("staticmethod", &["meth", "obj"]),
    ObjType::new("attribute", &["attr", "obj"]),
    ObjType::new("property", &["attr", "obj"]),
    ObjType::new("module", &["mod", "obj"]),
];

/// Python domain (`py`)
#[derive(Debug)]
pub struct PythonDomain {
    /// Append `()` to function and method titles
    add_function_parentheses: bool,
}

impl PythonDomain {
    /// Create a new Python domain
    pub fn new() -> Self {
        Self {
            add_function_parentheses: true,
        }
    }

    pub fn without_function_parentheses() -> Self {
        Self {
            add_function_parentheses: false,
        }
    }
}

impl Default for PythonDomain {
    fn default() -> Self {
        Self::new()
    }
}

impl Domain for PythonDomain {
    fn name(&self) -> &str {
        "py"
    }

    fn label(&self) -> &str {
        "Python"
    }

    fn object_types(&self) -> &[ObjType] {
        OBJECT_TYPES
    }

    fn role(&self, name: &str) -> Option<XRefRole> {
        match name {
            "func" | "meth" => Some(if self.add_function_parentheses {
                XRefRole::literal().with_parens()
            } else {
                XRefRole::literal()
            }),
            "data" | "exc" | "class" | "attr" | "mod" | "obj" => Some(XRefRole::literal()),
            _ => None,
        }
    }

    fn process_link(
        &self,
        has_explicit_title: bool,
        mut title: String,
        mut target: String,
    ) -> (String, String) {
        if !has_explicit_title {
            // a leading dot only has a meaning for the target
            title = title.trim_start_matches('.').to_string();
            // a leading tilde only has a meaning for the title
            target = target.trim_start_matches('~').to_string();
            if let Some(rest) = title.strip_prefix('~') {
                title = match rest.rfind('.') {
                    Some(dot) => rest[dot + 1..].to_string(),
                    None => rest.to_string(),
                };
            }
        }
        if let Some(rest) = target.strip_prefix('.') {
            target = rest.to_string();
        }
        (title, target)
    }
}
