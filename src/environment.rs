//! Build environment: the collaborator the intersphinx core runs inside.
//!
//! Owns the domain registry, the intersphinx state, the current-document
//! context roles read, and the warning sink.

use std::path::{Path, PathBuf};

use log::warn;
use parking_lot::Mutex;

use crate::cache::{DisabledReftypes, InventoryState};
use crate::config::IntersphinxConfig;
use crate::domains::{Domain, DomainRegistry};
use crate::error::{BuildError, BuildWarning};

pub struct BuildEnvironment {
    srcdir: PathBuf,
    domains: DomainRegistry,
    intersphinx: InventoryState,
    /// Document currently being read
    docname: Option<String>,
    /// Domain of roles written without a `domain:` prefix
    default_domain: Option<String>,
    fail_on_warning: bool,
    warnings: Mutex<Vec<BuildWarning>>,
}

impl BuildEnvironment {
    /// Environment with the built-in domains
    pub fn new(srcdir: impl Into<PathBuf>, config: &IntersphinxConfig) -> Self {
        Self::with_domains(srcdir, config, DomainRegistry::with_builtin_domains())
    }

    pub fn with_domains(
        srcdir: impl Into<PathBuf>,
        config: &IntersphinxConfig,
        domains: DomainRegistry,
    ) -> Self {
        let disabled = DisabledReftypes::parse(&config.disabled_reftypes);
        let intersphinx = InventoryState::new(disabled, &domains);
        Self {
            srcdir: srcdir.into(),
            domains,
            intersphinx,
            docname: None,
            default_domain: None,
            fail_on_warning: config.fail_on_warning,
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn srcdir(&self) -> &Path {
        &self.srcdir
    }

    pub fn domains(&self) -> &DomainRegistry {
        &self.domains
    }

    pub fn domain(&self, name: &str) -> Option<&dyn Domain> {
        self.domains.get(name)
    }

    pub fn intersphinx(&self) -> &InventoryState {
        &self.intersphinx
    }

    pub fn intersphinx_mut(&mut self) -> &mut InventoryState {
        &mut self.intersphinx
    }

    pub fn docname(&self) -> Option<&str> {
        self.docname.as_deref()
    }

    pub fn set_current_document(&mut self, docname: Option<&str>) {
        self.docname = docname.map(str::to_string);
    }

    pub fn default_domain(&self) -> Option<&dyn Domain> {
        self.default_domain
            .as_deref()
            .and_then(|name| self.domains.get(name))
    }

    /// Unknown domain names clear the default.
    pub fn set_default_domain(&mut self, name: Option<&str>) {
        self.default_domain = name.filter(|n| self.domains.contains(n)).map(str::to_string);
    }

    pub fn inventory_exists(&self, name: &str) -> bool {
        self.intersphinx.inventory_exists(name)
    }

    /// Rebuild the per-domain stores from the fetched inventories.
    pub fn rebuild_inventories(&mut self) {
        self.intersphinx.rebuild(&self.domains);
    }

    /// Log a warning and keep it for `finish`.
    pub fn warn(&self, warning: BuildWarning) {
        warn!("{}", warning);
        self.warnings.lock().push(warning);
    }

    pub fn warnings(&self) -> Vec<BuildWarning> {
        self.warnings.lock().clone()
    }

    /// Fail when warnings were recorded and warnings are errors.
    pub fn finish(&self) -> Result<(), BuildError> {
        let count = self.warnings.lock().len();
        if self.fail_on_warning && count > 0 {
            return Err(BuildError::WarningsAsErrors(count));
        }
        Ok(())
    }

    pub fn load_inventory_cache(&mut self, path: &Path) -> Result<bool, BuildError> {
        self.intersphinx.load_cache(path, &self.domains)
    }

    pub fn save_inventory_cache(&self, path: &Path) -> Result<(), BuildError> {
        self.intersphinx.save_cache(path)
    }
}
