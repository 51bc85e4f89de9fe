//! Migration source catalog: discovers and parses every migration file
//! contributed by the registered modules.
//!
//! Ordering is registration order across containers and lexicographic path
//! order within a container. Scripts from different modules are never
//! interleaved by file name.

use crate::core::error::{ErpkitError, Result};
use crate::core::migration::{self, MigrationScript};
use crate::core::module::Contribution;
use crate::core::source::AssetSource;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// A migration container together with the module that registered it.
pub type MigrationSource = Contribution<Arc<dyn AssetSource>>;

/// Collects and parses all migrations from `sources`.
///
/// - Zero sources yields an empty catalog.
/// - Sources that exist but contain no migration files yield
///   `NoMigrationsFound`; the caller decides whether that is fatal.
/// - Any parse failure or duplicate ID aborts the whole collection.
pub fn collect(sources: &[MigrationSource]) -> Result<Vec<MigrationScript>> {
    let mut scripts: Vec<MigrationScript> = Vec::new();
    let mut seen: FxHashMap<String, String> = FxHashMap::default();

    for source in sources {
        let label = source.item.label();
        let files = source.item.files()?;
        let before = scripts.len();

        for file in files.iter().filter(|f| migration::is_migration_file(&f.path)) {
            let diag = format!("{} ({}/{})", source.module, label, file.path);
            let script = migration::parse_migration(&source.module, &diag, &file.path, &file.contents)?;

            if let Some(first) = seen.get(script.id()) {
                return Err(ErpkitError::DuplicateMigrationId {
                    id: script.id().to_string(),
                    first: first.clone(),
                    second: diag,
                });
            }
            seen.insert(script.id().to_string(), diag);
            scripts.push(script);
        }

        debug!(
            module = %source.module,
            source = %label,
            scripts = scripts.len() - before,
            "collected migration source"
        );
    }

    if scripts.is_empty() && !sources.is_empty() {
        return Err(ErpkitError::NoMigrationsFound);
    }
    Ok(scripts)
}
