//! Feature modules and the module registry.
//!
//! A module is an independently developed feature unit. It contributes any
//! mix of migration containers, locale containers, permissions, navigation
//! items, GraphQL schema fragments, seed functions and services. The registry
//! snapshots those contributions at registration time and hands them out in
//! registration order.
//!
//! Lifecycle: `Empty -> Registering -> Frozen`. The first read freezes the
//! registry; a `register` after that fails with `RegistryFrozen`.

use crate::core::error::{ErpkitError, Result};
use crate::core::navigation::NavigationItem;
use crate::core::permission::Permission;
use crate::core::seed::SeedFn;
use crate::core::services::ServiceLocator;
use crate::core::source::AssetSource;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// An item tagged with the module that contributed it.
#[derive(Debug, Clone)]
pub struct Contribution<T> {
    pub module: String,
    pub item: T,
}

/// A GraphQL SDL fragment. Stitching happens outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaFragment {
    pub name: String,
    pub sdl: String,
}

impl SchemaFragment {
    pub fn new(name: impl Into<String>, sdl: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sdl: sdl.into(),
        }
    }
}

/// Contribution interface implemented by every feature module.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn migration_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        Vec::new()
    }

    fn locale_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        Vec::new()
    }

    fn permissions(&self) -> Vec<Permission> {
        Vec::new()
    }

    fn navigation(&self) -> Vec<NavigationItem> {
        Vec::new()
    }

    fn schema_fragments(&self) -> Vec<SchemaFragment> {
        Vec::new()
    }

    fn seeds(&self) -> Vec<SeedFn> {
        Vec::new()
    }

    /// Publishes this module's services. Runs once, during registration.
    fn register_services(&self, _services: &mut ServiceLocator) -> Result<()> {
        Ok(())
    }
}

struct ModuleEntry {
    name: String,
    migration_sources: Vec<Arc<dyn AssetSource>>,
    locale_sources: Vec<Arc<dyn AssetSource>>,
    permissions: Vec<Permission>,
    navigation: Vec<NavigationItem>,
    schema_fragments: Vec<SchemaFragment>,
    seeds: Vec<SeedFn>,
}

/// Contribution counts for one module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
    pub name: String,
    pub migration_sources: usize,
    pub locale_sources: usize,
    pub permissions: usize,
    pub navigation: usize,
    pub schema_fragments: usize,
    pub seeds: usize,
}

#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<ModuleEntry>,
    frozen: AtomicBool,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module`, snapshotting its contributions.
    pub fn register(&mut self, module: &dyn Module) -> Result<()> {
        let name = module.name().to_string();
        if self.is_frozen() {
            return Err(ErpkitError::RegistryFrozen(name));
        }
        if name.trim().is_empty() {
            return Err(ErpkitError::ValidationError("module name must not be empty".to_string()));
        }
        if self.entries.iter().any(|e| e.name == name) {
            return Err(ErpkitError::DuplicateModule(name));
        }

        let entry = ModuleEntry {
            migration_sources: module.migration_sources(),
            locale_sources: module.locale_sources(),
            permissions: module.permissions(),
            navigation: module.navigation(),
            schema_fragments: module.schema_fragments(),
            seeds: module.seeds(),
            name,
        };
        info!(
            module = %entry.name,
            migration_sources = entry.migration_sources.len(),
            permissions = entry.permissions.len(),
            "registered module"
        );
        self.entries.push(entry);
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    fn collect<T: Clone>(&self, pick: impl Fn(&ModuleEntry) -> &[T]) -> Vec<Contribution<T>> {
        self.freeze();
        self.entries
            .iter()
            .flat_map(|e| {
                pick(e).iter().map(move |item| Contribution {
                    module: e.name.clone(),
                    item: item.clone(),
                })
            })
            .collect()
    }

    pub fn migration_sources(&self) -> Vec<Contribution<Arc<dyn AssetSource>>> {
        self.collect(|e| e.migration_sources.as_slice())
    }

    pub fn locale_sources(&self) -> Vec<Contribution<Arc<dyn AssetSource>>> {
        self.collect(|e| e.locale_sources.as_slice())
    }

    pub fn permission_declarations(&self) -> Vec<Contribution<Permission>> {
        self.collect(|e| e.permissions.as_slice())
    }

    pub fn navigation_items(&self) -> Vec<Contribution<NavigationItem>> {
        self.collect(|e| e.navigation.as_slice())
    }

    pub fn schema_fragments(&self) -> Vec<Contribution<SchemaFragment>> {
        self.collect(|e| e.schema_fragments.as_slice())
    }

    pub fn seed_functions(&self) -> Vec<Contribution<SeedFn>> {
        self.collect(|e| e.seeds.as_slice())
    }

    /// Module names in registration order. Does not freeze the registry.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn summaries(&self) -> Vec<ModuleSummary> {
        self.entries
            .iter()
            .map(|e| ModuleSummary {
                name: e.name.clone(),
                migration_sources: e.migration_sources.len(),
                locale_sources: e.locale_sources.len(),
                permissions: e.permissions.len(),
                navigation: e.navigation.len(),
                schema_fragments: e.schema_fragments.len(),
                seeds: e.seeds.len(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
