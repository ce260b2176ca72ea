//! Intersphinx configuration.
//!
//! Values use the names of the corresponding Sphinx settings so that a
//! project's configuration can be carried over unchanged. The mapping is
//! normalized once when the configuration is loaded; malformed entries are
//! reported and dropped rather than failing the build.

use std::fs;
use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BuildError;

/// One external documentation set to link against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    /// Key the entry was configured under
    pub key: String,
    /// Inventory name, `None` for the legacy unnamed form
    pub name: Option<String>,
    /// Base URI links are generated against
    pub uri: String,
    /// Inventory locations to try in order; `None` means `{uri}/objects.inv`
    pub invs: Vec<Option<String>>,
}

impl MappingEntry {
    pub fn named(name: &str, uri: &str, invs: Vec<Option<String>>) -> Self {
        Self {
            key: name.to_string(),
            name: Some(name.to_string()),
            uri: uri.to_string(),
            invs,
        }
    }

    pub fn unnamed(uri: &str, invs: Vec<Option<String>>) -> Self {
        Self {
            key: uri.to_string(),
            name: None,
            uri: uri.to_string(),
            invs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntersphinxConfig {
    /// Mapping as written in the configuration file
    #[serde(rename = "intersphinx_mapping")]
    pub raw_mapping: IndexMap<String, Value>,

    /// Days a remote inventory stays fresh
    #[serde(rename = "intersphinx_cache_limit")]
    pub cache_limit: i64,

    /// HTTP timeout in seconds; no timeout when unset
    #[serde(rename = "intersphinx_timeout")]
    pub timeout: Option<f64>,

    #[serde(rename = "intersphinx_disabled_reftypes")]
    pub disabled_reftypes: Vec<String>,

    /// Fetch worker count; defaults to the available parallelism
    #[serde(rename = "intersphinx_workers")]
    pub workers: Option<usize>,

    pub tls_verify: bool,

    pub user_agent: Option<String>,

    /// Treat warnings as errors
    pub fail_on_warning: bool,

    /// Normalized `raw_mapping`, filled by `normalize_mapping`
    #[serde(skip)]
    pub mapping: Vec<MappingEntry>,
}

impl Default for IntersphinxConfig {
    fn default() -> Self {
        Self {
            raw_mapping: IndexMap::new(),
            cache_limit: 5,
            timeout: None,
            disabled_reftypes: vec!["std:doc".to_string()],
            workers: None,
            tls_verify: true,
            user_agent: None,
            fail_on_warning: false,
            mapping: Vec::new(),
        }
    }
}

impl IntersphinxConfig {
    /// Load from a TOML, YAML or JSON file, chosen by extension.
    pub fn from_file(path: &Path) -> Result<Self, BuildError> {
        let content = fs::read_to_string(path)?;
        let config_error = |message: String| BuildError::Config {
            path: path.to_path_buf(),
            message,
        };

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut config: IntersphinxConfig = match extension.as_str() {
            "toml" => toml::from_str(&content).map_err(|e| config_error(e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).map_err(|e| config_error(e.to_string()))?
            }
            "json" => serde_json::from_str(&content).map_err(|e| config_error(e.to_string()))?,
            other => {
                return Err(config_error(format!(
                    "unsupported configuration format '{}'",
                    other
                )))
            }
        };
        config.normalize_mapping();
        Ok(config)
    }

    /// Rebuild the normalized mapping from `raw_mapping`.
    pub fn normalize_mapping(&mut self) {
        self.mapping = self
            .raw_mapping
            .iter()
            .filter_map(|(key, value)| match normalize_entry(key, value) {
                Ok(entry) => entry,
                Err(reason) => {
                    warn!(
                        "Failed to read intersphinx_mapping[{}], ignored: {}",
                        key, reason
                    );
                    None
                }
            })
            .collect();
    }

    /// Add an already-normalized mapping entry.
    pub fn with_mapping_entry(mut self, entry: MappingEntry) -> Self {
        self.mapping.push(entry);
        self
    }

    /// The timeout as a `Duration`; unset, non-positive and out-of-range
    /// values mean no timeout.
    pub fn timeout_duration(&self) -> Option<Duration> {
        let secs = self.timeout.filter(|secs| *secs > 0.0)?;
        match Duration::try_from_secs_f64(secs) {
            Ok(duration) => Some(duration),
            Err(err) => {
                warn!("intersphinx_timeout {} ignored: {}", secs, err);
                None
            }
        }
    }
}

/// `Ok(None)` when the entry is skipped with a warning already logged.
fn normalize_entry(key: &str, value: &Value) -> Result<Option<MappingEntry>, String> {
    match value {
        Value::Array(pair) => {
            if key.trim().is_empty() {
                warn!("intersphinx identifier {:?} is not a valid name. Ignored", key);
                return Ok(None);
            }
            let [uri, invs] = pair.as_slice() else {
                return Err(format!(
                    "expected a (base URI, inventory) pair, got {} values",
                    pair.len()
                ));
            };
            let uri = uri
                .as_str()
                .ok_or_else(|| format!("base URI {} is not a string", uri))?;
            Ok(Some(MappingEntry {
                key: key.to_string(),
                name: Some(key.to_string()),
                uri: uri.to_string(),
                invs: candidate_locations(invs)?,
            }))
        }
        Value::String(_) | Value::Null => {
            warn!(
                "The pre-Sphinx 1.0 'intersphinx_mapping' format is deprecated and will be \
                 removed. Update to the current format as described in the documentation. \
                 https://www.sphinx-doc.org/en/master/usage/extensions/intersphinx.html#confval-intersphinx_mapping"
            );
            Ok(Some(MappingEntry {
                key: key.to_string(),
                name: None,
                uri: key.to_string(),
                invs: candidate_locations(value)?,
            }))
        }
        other => Err(format!("unsupported value {}", other)),
    }
}

fn candidate_locations(value: &Value) -> Result<Vec<Option<String>>, String> {
    let location = |value: &Value| match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(format!("inventory location {} is not a string", other)),
    };
    match value {
        Value::Array(values) => values.iter().map(location).collect(),
        single => Ok(vec![location(single)?]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Parse `mapping` as JSON, keeping the key order of the source text.
    fn normalized(mapping: &str) -> Vec<MappingEntry> {
        let mut config = IntersphinxConfig {
            raw_mapping: serde_json::from_str(mapping).unwrap(),
            ..Default::default()
        };
        config.normalize_mapping();
        config.mapping
    }

    #[test]
    fn test_defaults() {
        let config = IntersphinxConfig::default();
        assert_eq!(config.cache_limit, 5);
        assert_eq!(config.disabled_reftypes, vec!["std:doc"]);
        assert!(config.timeout_duration().is_none());
        assert!(config.tls_verify);
        assert!(config.mapping.is_empty());
    }

    #[test]
    fn test_current_format() {
        let entries = normalized(
            r#"{
                "python": ["https://docs.python.org/3", null],
                "numpy": ["https://numpy.org/doc/stable/", ["local.inv", null]],
                "sphinx": ["https://www.sphinx-doc.org/en/master", "objects.inv"]
            }"#,
        );
        assert_eq!(
            entries,
            vec![
                MappingEntry::named("python", "https://docs.python.org/3", vec![None]),
                MappingEntry::named(
                    "numpy",
                    "https://numpy.org/doc/stable/",
                    vec![Some("local.inv".into()), None]
                ),
                MappingEntry::named(
                    "sphinx",
                    "https://www.sphinx-doc.org/en/master",
                    vec![Some("objects.inv".into())]
                ),
            ]
        );
    }

    #[test]
    fn test_legacy_format_is_unnamed() {
        let entries = normalized(r#"{ "https://docs.python.org/3": null }"#);
        assert_eq!(
            entries,
            vec![MappingEntry::unnamed("https://docs.python.org/3", vec![None])]
        );
    }

    #[test]
    fn test_malformed_entries_dropped() {
        let entries = normalized(
            r#"{
                "good": ["https://good", null],
                "": ["https://empty-name", null],
                "triple": ["https://a", null, null],
                "number": [42, null],
                "badinv": ["https://b", [1]],
                "object": {"uri": "https://c"}
            }"#,
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "good");
    }

    #[test]
    fn test_out_of_range_timeout_means_no_timeout() {
        let mut config = IntersphinxConfig {
            timeout: Some(1e30),
            ..Default::default()
        };
        assert_eq!(config.timeout_duration(), None);
        config.timeout = Some(f64::INFINITY);
        assert_eq!(config.timeout_duration(), None);
        config.timeout = Some(f64::NAN);
        assert_eq!(config.timeout_duration(), None);
        config.timeout = Some(-1.0);
        assert_eq!(config.timeout_duration(), None);
        config.timeout = Some(0.25);
        assert_eq!(config.timeout_duration(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.toml");
        fs::write(
            &path,
            r#"
intersphinx_cache_limit = 2
intersphinx_timeout = 3.5
intersphinx_disabled_reftypes = ["*"]
fail_on_warning = true

[intersphinx_mapping]
python = ["https://docs.python.org/3", ""]
"#,
        )
        .unwrap();

        let config = IntersphinxConfig::from_file(&path).unwrap();
        assert_eq!(config.cache_limit, 2);
        assert_eq!(config.timeout_duration(), Some(Duration::from_millis(3500)));
        assert_eq!(config.disabled_reftypes, vec!["*"]);
        assert!(config.fail_on_warning);
        assert_eq!(
            config.mapping,
            [MappingEntry::named("python", "https://docs.python.org/3", vec![None])]
        );
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.yaml");
        fs::write(
            &path,
            "intersphinx_mapping:\n  sphinx:\n    - https://www.sphinx-doc.org/en/master\n    - null\n",
        )
        .unwrap();

        let config = IntersphinxConfig::from_file(&path).unwrap();
        assert_eq!(config.mapping.len(), 1);
        assert_eq!(config.mapping[0].name.as_deref(), Some("sphinx"));
        assert_eq!(config.cache_limit, 5);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.ini");
        fs::write(&path, "").unwrap();
        assert!(matches!(
            IntersphinxConfig::from_file(&path),
            Err(BuildError::Config { .. })
        ));
    }
}
