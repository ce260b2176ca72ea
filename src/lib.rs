//! Intersphinx Ultra
//!
//! Cross-project linking for Sphinx-style documentation builds: fetches the
//! `objects.inv` inventories other projects publish, caches them in the build
//! environment, and resolves cross-references against them.

pub mod cache;
pub mod config;
pub mod domains;
pub mod environment;
pub mod error;
pub mod fetch;
pub mod inventory;
pub mod nodes;
pub mod resolver;
pub mod roles;

pub use cache::{CacheEntry, DisabledReftypes, InventoryState};
pub use config::{IntersphinxConfig, MappingEntry};
pub use domains::{Domain, DomainInventory, DomainRegistry, ObjType, XRefRole};
pub use environment::BuildEnvironment;
pub use error::{BuildError, BuildWarning, FetchError, InventoryError, ResolveError, WarningKind};
pub use fetch::{load_mappings, load_mappings_at, GroupOutcome, InventoryFetcher};
pub use inventory::{
    DocumentedObject, Inventory, InventoryFile, InventoryItem, InventoryItemSet,
};
pub use nodes::{Node, PendingXref, Reference, TextElement, TextKind};
pub use resolver::{
    missing_reference, resolve_pending_references, resolve_reference_any_inventory,
    resolve_reference_detect_inventory, resolve_reference_in_inventory, IntersphinxRoleResolver,
    ResolutionStats,
};
pub use roles::{read_inline, IntersphinxDispatcher, IntersphinxRole};
