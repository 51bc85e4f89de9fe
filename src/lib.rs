//! erpkit: module composition and schema migrations for modular business
//! applications.
//!
//! An application is assembled at startup from independently developed
//! feature modules. Each module contributes any mix of:
//!
//! - migration containers (`-- +migrate Up` / `-- +migrate Down` SQL files)
//! - locale containers (JSON message catalogs)
//! - permissions, navigation items and GraphQL schema fragments
//! - seed functions and typed services
//!
//! # Architecture
//!
//! ## Bootstrap
//!
//! [`core::application::AppBuilder`] registers modules into a
//! [`core::module::ModuleRegistry`] and a [`core::services::ServiceLocator`].
//! `build()` freezes the registry and runs each aggregator once: the
//! migration catalog, the permission set, the locale bundle and navigation
//! validation. Any failure aborts startup before the database is touched.
//!
//! ## Migrations
//!
//! The catalog orders scripts by module registration order, then by path
//! within a module. The planner diffs the catalog against the ledger table;
//! the executor applies a plan in exactly one transaction.
//!
//! # Examples
//!
//! ```bash
//! # Show what would run
//! erpkit migrate up --dry-run
//!
//! # Apply everything, then seed reference data
//! erpkit migrate up
//! erpkit seed
//!
//! # Roll back the latest migration
//! erpkit migrate down
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: the engine (catalog, planner, executor, registry, aggregators)
//! - [`plugins`]: built-in feature modules (`core`, `crm`, `warehouse`, `local`)

pub mod core;
pub mod plugins;

mod cli;

use crate::cli::{Cli, Command, MigrateCommand, OutputFormat};
use crate::core::application::{Application, MigrationReport, MigrationStatus, Rollback};
use crate::core::config::Config;
use crate::core::migration::Direction;
use crate::core::{db, error, logging, time};
use clap::Parser;
use colored::Colorize;
use serde_json::{Value as JsonValue, json};
use std::num::NonZeroUsize;

pub fn run() -> Result<(), error::ErpkitError> {
    let cli = Cli::parse();

    if let Command::Version = cli.command {
        println!("v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database = db;
    }
    logging::init_logging(&config.logging);

    let app = plugins::bootstrap(config)?;
    let out = Output { format: cli.format };

    match cli.command {
        Command::Migrate(migrate) => run_migrate(&app, migrate.command, &out),
        Command::Seed => {
            let mut conn = db::db_connect(&app.config().database)?;
            let n = app.seed(&mut conn)?;
            out.emit("seed", json!({ "seeds": n }), || {
                println!("{} ran {} seed function(s)", "✓".bright_green(), n);
            })
        }
        Command::Modules => {
            let summaries = app.registry().summaries();
            out.emit("modules", json!({ "modules": summaries }), || {
                for m in &summaries {
                    println!(
                        "{} {:<12} migrations:{} locales:{} permissions:{} nav:{} schema:{} seeds:{}",
                        "●".bright_green(),
                        m.name.bright_white(),
                        m.migration_sources,
                        m.locale_sources,
                        m.permissions,
                        m.navigation,
                        m.schema_fragments,
                        m.seeds
                    );
                }
            })
        }
        Command::Permissions => {
            let rows: Vec<JsonValue> = app
                .permissions()
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "resource": p.resource,
                        "action": p.action,
                        "modifier": p.modifier,
                        "module": app.permissions().declared_by(&p.name),
                    })
                })
                .collect();
            out.emit("permissions", json!({ "permissions": rows }), || {
                for p in app.permissions().iter() {
                    println!(
                        "{:<28} {:<16} {:<7} {:<4} {}",
                        p.name.bright_white(),
                        p.resource,
                        p.action,
                        p.modifier,
                        app.permissions().declared_by(&p.name).unwrap_or("-").dimmed()
                    );
                }
            })
        }
        Command::Nav { locale } => {
            let locale = locale.unwrap_or_else(|| app.config().default_locale.clone());
            let items = app.navigation(&locale)?;
            out.emit("nav", json!({ "locale": locale, "items": items }), || {
                for item in &items {
                    print_nav(item, 0);
                }
            })
        }
        Command::Schema => {
            let fragments: Vec<JsonValue> = app
                .schema_fragments()
                .map(|c| json!({ "module": c.module, "name": c.item.name, "sdl": c.item.sdl }))
                .collect();
            let sdl = app.schema_sdl();
            out.emit("schema", json!({ "fragments": fragments }), || println!("{}", sdl))
        }
        Command::Version => Ok(()),
    }
}

fn run_migrate(app: &Application, command: MigrateCommand, out: &Output) -> Result<(), error::ErpkitError> {
    let database = &app.config().database;
    match command {
        MigrateCommand::Up { limit, dry_run } => {
            let report = if dry_run {
                app.dry_run(&db::db_open_existing(database)?, Direction::Up, limit)?
            } else {
                app.migrate_up(&mut db::db_connect(database)?, limit)?
            };
            print_report("migrate.up", &report, out)
        }
        MigrateCommand::Down { limit, all, dry_run } => {
            let steps = if all {
                Rollback::All
            } else {
                let n = NonZeroUsize::new(limit).ok_or_else(|| {
                    error::ErpkitError::ValidationError(
                        "--limit must be greater than zero; use --all to roll back everything".to_string(),
                    )
                })?;
                Rollback::Steps(n)
            };
            let report = if dry_run {
                app.dry_run_rollback(&db::db_open_existing(database)?, steps)?
            } else {
                app.rollback(&mut db::db_connect(database)?, steps)?
            };
            print_report("migrate.down", &report, out)
        }
        MigrateCommand::Redo => {
            let report = app.redo(&mut db::db_connect(database)?)?;
            print_report("migrate.redo", &report, out)
        }
        MigrateCommand::Status => {
            let status = app.migration_status(&db::db_open_existing(database)?)?;
            print_status(&status, out)
        }
    }
}

struct Output {
    format: OutputFormat,
}

impl Output {
    /// JSON mode prints one envelope; text mode runs `text`.
    fn emit(&self, cmd: &str, payload: JsonValue, text: impl FnOnce()) -> Result<(), error::ErpkitError> {
        match self.format {
            OutputFormat::Json => {
                let envelope = time::command_envelope(cmd, "ok", payload);
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            }
            OutputFormat::Text => text(),
        }
        Ok(())
    }
}

fn print_report(cmd: &str, report: &MigrationReport, out: &Output) -> Result<(), error::ErpkitError> {
    out.emit(cmd, serde_json::to_value(report)?, || {
        if report.ids.is_empty() {
            println!("{} nothing to {}", "●".bright_green(), report.direction);
            return;
        }
        if report.dry_run {
            println!(
                "{} plan ({}): {} migration(s)",
                "○".bright_yellow(),
                report.direction,
                report.ids.len()
            );
        } else {
            println!(
                "{} {} migration(s) applied ({})",
                "✓".bright_green(),
                report.applied,
                report.direction
            );
        }
        for id in &report.ids {
            println!("    {}", id.bright_white());
        }
    })
}

fn print_status(status: &MigrationStatus, out: &Output) -> Result<(), error::ErpkitError> {
    out.emit("migrate.status", serde_json::to_value(status)?, || {
        for s in &status.scripts {
            match &s.applied_at {
                Some(at) => println!(
                    "{} {:<10} {:<40} {}",
                    "✓".bright_green(),
                    s.module,
                    s.id.bright_white(),
                    at.dimmed()
                ),
                None => println!("{} {:<10} {:<40} {}", "○".bright_yellow(), s.module, s.id, "pending".yellow()),
            }
        }
        for r in &status.unknown {
            println!("{} {:<10} {:<40} {}", "✗".bright_red(), "?", r.id.red(), "not in catalog".red());
        }
        println!(
            "{} applied, {} pending",
            status.scripts.len() - status.pending(),
            status.pending()
        );
    })
}

fn print_nav(item: &crate::core::navigation::NavigationItem, depth: usize) {
    let indent = "  ".repeat(depth);
    let perms = if item.permissions.is_empty() {
        String::new()
    } else {
        format!(" [{}]", item.permissions.join(", "))
    };
    println!("{}{} {}{}", indent, item.name.bright_white(), item.href.dimmed(), perms.dimmed());
    for child in &item.children {
        print_nav(child, depth + 1);
    }
}
