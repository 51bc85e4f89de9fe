//! Seed functions: idempotent data loaders run after migrations.

use crate::core::error::Result;
use crate::core::module::Contribution;
use crate::core::permission::PermissionSet;
use crate::core::services::ServiceLocator;
use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

/// Everything a seed function may touch.
pub struct SeedContext<'a> {
    /// Connection inside the seeding transaction.
    pub conn: &'a Connection,
    pub services: &'a ServiceLocator,
    pub permissions: &'a PermissionSet,
}

pub type SeedFn = fn(&SeedContext<'_>) -> Result<()>;

/// Runs `seeds` in order inside one transaction; the first failure rolls
/// everything back. Returns the number of seed functions run.
pub fn run_seeds(
    seeds: &[Contribution<SeedFn>],
    conn: &mut Connection,
    services: &ServiceLocator,
    permissions: &PermissionSet,
) -> Result<usize> {
    let tx: Transaction<'_> = conn.transaction()?;
    {
        let ctx = SeedContext {
            conn: &tx,
            services,
            permissions,
        };
        for seed in seeds {
            debug!(module = %seed.module, "running seed");
            (seed.item)(&ctx)?;
        }
    }
    tx.commit()?;
    info!(seeds = seeds.len(), "seeding committed");
    Ok(seeds.len())
}
