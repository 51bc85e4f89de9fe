//! CLI struct definitions for the `erpkit` command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "erpkit",
    version = env!("CARGO_PKG_VERSION"),
    about = "Compose feature modules and manage their database schema",
    disable_version_flag = true
)]
pub(crate) struct Cli {
    /// Config file (defaults to $ERPKIT_CONFIG, then ./erpkit.toml).
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Database path; overrides the config file and $ERPKIT_DATABASE.
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,
    /// Output format.
    #[clap(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Plan and apply schema migrations
    Migrate(MigrateCli),
    /// Run every module's seed functions in one transaction
    Seed,
    /// List registered modules and what they contribute
    Modules,
    /// List aggregated permissions
    Permissions,
    /// Print translated navigation
    Nav {
        /// Locale to translate into (defaults to the configured default locale).
        #[clap(long)]
        locale: Option<String>,
    },
    /// Print GraphQL schema fragments in registration order
    Schema,
    /// Print the version
    Version,
}

#[derive(clap::Args, Debug)]
pub(crate) struct MigrateCli {
    #[clap(subcommand)]
    pub command: MigrateCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum MigrateCommand {
    /// Apply pending migrations
    Up {
        /// Apply at most N migrations (0 = all).
        #[clap(long, default_value_t = 0)]
        limit: usize,
        /// Print the plan without executing it.
        #[clap(long)]
        dry_run: bool,
    },
    /// Roll back applied migrations, most recent first
    Down {
        /// Roll back N migrations.
        #[clap(long, default_value_t = 1, conflicts_with = "all")]
        limit: usize,
        /// Roll back every applied migration.
        #[clap(long)]
        all: bool,
        /// Print the plan without executing it.
        #[clap(long)]
        dry_run: bool,
    },
    /// Roll back the most recent migration and apply it again
    Redo,
    /// Show applied and pending migrations
    Status,
}
