//! The application context: bootstrap-time builder and the frozen runtime.
//!
//! `AppBuilder` owns the module registry and the service locator while
//! modules register (single-threaded). `AppBuilder::build` consumes it, runs
//! every aggregator once and returns an `Application` that is read-only and
//! safe to share across threads. Migration and seed operations borrow a
//! connection from the caller; the application itself holds no database
//! handle.

use crate::core::catalog;
use crate::core::config::Config;
use crate::core::error::{ErpkitError, Result};
use crate::core::executor;
use crate::core::journal::{MigrationJournal, RunOutcome};
use crate::core::ledger::{self, LedgerReader, MemoryLedger, SqliteLedger};
use crate::core::locale::LocaleBundle;
use crate::core::migration::{Direction, MigrationScript};
use crate::core::module::{Contribution, Module, ModuleRegistry, SchemaFragment};
use crate::core::navigation::{self, NavigationItem};
use crate::core::permission::PermissionSet;
use crate::core::planner::{self, MigrationPlan, PlanOptions};
use crate::core::seed::{self, SeedFn};
use crate::core::services::ServiceLocator;
use rusqlite::Connection;
use serde::Serialize;
use std::num::NonZeroUsize;
use tracing::{error, info, warn};

/// How far `rollback` goes. Defaults to one step; reverting everything
/// has to be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollback {
    Steps(NonZeroUsize),
    All,
}

impl Default for Rollback {
    fn default() -> Self {
        Rollback::Steps(NonZeroUsize::MIN)
    }
}

impl Rollback {
    fn options(self, ignore_unknown: bool) -> PlanOptions {
        match self {
            Rollback::Steps(n) => PlanOptions {
                limit: n.get(),
                all: false,
                ignore_unknown,
            },
            Rollback::All => PlanOptions {
                limit: 0,
                all: true,
                ignore_unknown,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub direction: Direction,
    pub ids: Vec<String>,
    pub applied: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptStatus {
    pub id: String,
    pub module: String,
    pub checksum: String,
    pub applied_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub scripts: Vec<ScriptStatus>,
    /// Ledger rows no registered module provides.
    pub unknown: Vec<ledger::MigrationRecord>,
}

impl MigrationStatus {
    pub fn pending(&self) -> usize {
        self.scripts.iter().filter(|s| s.applied_at.is_none()).count()
    }
}

pub struct AppBuilder {
    config: Config,
    registry: ModuleRegistry,
    services: ServiceLocator,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: ModuleRegistry::new(),
            services: ServiceLocator::new(),
        }
    }

    /// Registers a module and lets it publish its services. On failure
    /// neither the module nor any of its services are kept.
    pub fn register(&mut self, module: &dyn Module) -> Result<&mut Self> {
        let mut services = ServiceLocator::new();
        module.register_services(&mut services)?;
        self.registry.register(module)?;
        self.services.absorb(services);
        Ok(self)
    }

    /// Direct access for host-provided services (clock, mailer, ...).
    pub fn services_mut(&mut self) -> &mut ServiceLocator {
        &mut self.services
    }

    /// Freezes the registry and runs the aggregators. Any failure here is a
    /// bootstrap failure; nothing has touched the database yet.
    pub fn build(self) -> Result<Application> {
        let AppBuilder {
            config,
            registry,
            services,
        } = self;

        let permissions = PermissionSet::build(&registry.permission_declarations())?;
        let locales = LocaleBundle::build(&config.default_locale, &registry.locale_sources())?;
        let navigation = registry.navigation_items();
        navigation::validate(&navigation, &permissions)?;

        let catalog = match catalog::collect(&registry.migration_sources()) {
            Ok(scripts) => scripts,
            Err(ErpkitError::NoMigrationsFound) if !config.migrations.require_migrations => {
                warn!("no migrations found in registered modules");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        if catalog.is_empty() && config.migrations.require_migrations {
            return Err(ErpkitError::NoMigrationsFound);
        }

        info!(
            modules = registry.len(),
            migrations = catalog.len(),
            permissions = permissions.len(),
            services = services.len(),
            "bootstrap complete"
        );

        Ok(Application {
            schema: registry.schema_fragments(),
            seeds: registry.seed_functions(),
            config,
            registry,
            services,
            permissions,
            locales,
            navigation,
            catalog,
        })
    }
}

pub struct Application {
    config: Config,
    registry: ModuleRegistry,
    services: ServiceLocator,
    permissions: PermissionSet,
    locales: LocaleBundle,
    navigation: Vec<Contribution<NavigationItem>>,
    schema: Vec<Contribution<SchemaFragment>>,
    seeds: Vec<Contribution<SeedFn>>,
    catalog: Vec<MigrationScript>,
}

impl Application {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn services(&self) -> &ServiceLocator {
        &self.services
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn locales(&self) -> &LocaleBundle {
        &self.locales
    }

    pub fn catalog(&self) -> &[MigrationScript] {
        &self.catalog
    }

    fn table(&self) -> &str {
        &self.config.migrations.table
    }

    fn journal(&self) -> Option<MigrationJournal> {
        self.config.migrations.journal.as_ref().map(MigrationJournal::new)
    }

    fn options(&self, limit: usize) -> PlanOptions {
        PlanOptions {
            limit,
            all: false,
            ignore_unknown: self.config.migrations.ignore_unknown,
        }
    }

    /// Plans against the ledger in `conn`, creating the ledger table if needed.
    /// A `Down` plan with `limit == 0` is one step; see `plan_rollback`.
    pub fn plan(&self, conn: &Connection, direction: Direction, limit: usize) -> Result<MigrationPlan<'_>> {
        ledger::ensure_table(conn, self.table())?;
        self.plan_with(conn, direction, self.options(limit))
    }

    pub fn plan_rollback(&self, conn: &Connection, steps: Rollback) -> Result<MigrationPlan<'_>> {
        ledger::ensure_table(conn, self.table())?;
        let options = steps.options(self.config.migrations.ignore_unknown);
        self.plan_with(conn, Direction::Down, options)
    }

    fn plan_with(&self, conn: &Connection, direction: Direction, options: PlanOptions) -> Result<MigrationPlan<'_>> {
        let ledger = SqliteLedger::new(conn, self.table());
        planner::plan(&self.catalog, &ledger, direction, options)
    }

    /// Applies pending migrations; `limit == 0` applies all of them.
    pub fn migrate_up(&self, conn: &mut Connection, limit: usize) -> Result<MigrationReport> {
        let plan = self.plan(conn, Direction::Up, limit)?;
        self.execute("migrate.up", &plan, conn)
    }

    pub fn rollback(&self, conn: &mut Connection, steps: Rollback) -> Result<MigrationReport> {
        let plan = self.plan_rollback(conn, steps)?;
        self.execute("migrate.down", &plan, conn)
    }

    /// Computes what `migrate_up` would do (or a bounded rollback, for
    /// `Down`) without executing it. Never writes to `conn`.
    pub fn dry_run(&self, conn: &Connection, direction: Direction, limit: usize) -> Result<MigrationReport> {
        self.preview(conn, direction, self.options(limit))
    }

    /// Computes what `rollback` would do without executing it.
    pub fn dry_run_rollback(&self, conn: &Connection, steps: Rollback) -> Result<MigrationReport> {
        let options = steps.options(self.config.migrations.ignore_unknown);
        self.preview(conn, Direction::Down, options)
    }

    // A missing ledger table reads as an empty ledger.
    fn preview(&self, conn: &Connection, direction: Direction, options: PlanOptions) -> Result<MigrationReport> {
        let plan = if ledger::table_exists(conn, self.table())? {
            self.plan_with(conn, direction, options)?
        } else {
            planner::plan(&self.catalog, &MemoryLedger::new(), direction, options)?
        };
        Ok(MigrationReport {
            direction,
            ids: plan.ids().into_iter().map(str::to_string).collect(),
            applied: 0,
            dry_run: true,
        })
    }

    /// Rolls back the most recently applied script and re-applies it, in one
    /// transaction.
    pub fn redo(&self, conn: &mut Connection) -> Result<MigrationReport> {
        let down = self.plan(conn, Direction::Down, 1)?;
        if down.is_empty() {
            return Ok(MigrationReport {
                direction: Direction::Up,
                ids: Vec::new(),
                applied: 0,
                dry_run: false,
            });
        }
        let up = MigrationPlan {
            direction: Direction::Up,
            steps: down.steps.clone(),
        };

        let result: Result<usize> = (|| {
            let tx = conn.transaction()?;
            executor::run_in(&tx, &down, self.table())?;
            let n = executor::run_in(&tx, &up, self.table())?;
            tx.commit()?;
            Ok(n)
        })();
        if let Err(e) = &result {
            error!(error = %e, "redo rolled back");
        }
        self.finish("migrate.redo", &up, result)
    }

    fn execute(&self, op: &str, plan: &MigrationPlan<'_>, conn: &mut Connection) -> Result<MigrationReport> {
        let result = executor::apply(plan, conn, self.table());
        self.finish(op, plan, result)
    }

    fn finish(&self, op: &str, plan: &MigrationPlan<'_>, result: Result<usize>) -> Result<MigrationReport> {
        if let Some(journal) = self.journal() {
            let outcome = RunOutcome {
                op,
                direction: plan.direction,
                ids: plan.ids().into_iter().map(str::to_string).collect(),
                checksums: plan.steps.iter().map(|s| s.checksum().to_string()).collect(),
                result: result.as_ref().copied(),
            };
            if let Err(journal_err) = journal.record(outcome) {
                error!(journal = %journal.path().display(), error = %journal_err, "failed to write migration journal");
                // A failed run keeps its own error; a committed run reports the journal failure.
                if result.is_ok() {
                    return Err(journal_err);
                }
            }
        }

        let applied = result?;
        Ok(MigrationReport {
            direction: plan.direction,
            ids: plan.ids().into_iter().map(str::to_string).collect(),
            applied,
            dry_run: false,
        })
    }

    /// Read-only; a database without a ledger table has nothing applied.
    pub fn migration_status(&self, conn: &Connection) -> Result<MigrationStatus> {
        let records = if ledger::table_exists(conn, self.table())? {
            SqliteLedger::new(conn, self.table()).records()?
        } else {
            Vec::new()
        };

        let scripts = self
            .catalog
            .iter()
            .map(|s| ScriptStatus {
                id: s.id().to_string(),
                module: s.module().to_string(),
                checksum: s.checksum().to_string(),
                applied_at: records.iter().find(|r| r.id == s.id()).map(|r| r.applied_at.clone()),
            })
            .collect();
        let unknown = records
            .into_iter()
            .filter(|r| !self.catalog.iter().any(|s| s.id() == r.id))
            .collect();
        Ok(MigrationStatus { scripts, unknown })
    }

    /// Runs every module's seed functions in registration order, in one
    /// transaction.
    pub fn seed(&self, conn: &mut Connection) -> Result<usize> {
        seed::run_seeds(&self.seeds, conn, &self.services, &self.permissions)
    }

    /// Untranslated navigation items in registration order.
    pub fn navigation_items(&self) -> impl Iterator<Item = &NavigationItem> {
        self.navigation.iter().map(|c| &c.item)
    }

    /// Navigation translated into `locale`.
    pub fn navigation(&self, locale: &str) -> Result<Vec<NavigationItem>> {
        self.navigation
            .iter()
            .map(|c| c.item.translate(&self.locales, locale))
            .collect()
    }

    pub fn schema_fragments(&self) -> impl Iterator<Item = &Contribution<SchemaFragment>> {
        self.schema.iter()
    }

    /// All schema fragments joined in registration order.
    pub fn schema_sdl(&self) -> String {
        self.schema
            .iter()
            .map(|c| format!("# {}: {}\n{}", c.module, c.item.name, c.item.sdl.trim_end()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
