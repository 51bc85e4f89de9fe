//! `erpkit.toml` loading.
//!
//! A missing file is not an error: every key has a default. Environment
//! variables and CLI flags are layered on top by the caller.

use crate::core::error::{ErpkitError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_CONFIG_FILE: &str = "erpkit.toml";
pub const CONFIG_ENV: &str = "ERPKIT_CONFIG";
pub const DATABASE_ENV: &str = "ERPKIT_DATABASE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: PathBuf,
    /// Enabled built-in modules. Empty means all of them.
    pub modules: Vec<String>,
    pub default_locale: String,
    pub migrations: MigrationsConfig,
    pub local: LocalConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("erpkit.db"),
            modules: Vec::new(),
            default_locale: "en".to_string(),
            migrations: MigrationsConfig::default(),
            local: LocalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationsConfig {
    /// Ledger table name.
    pub table: String,
    /// Tolerate ledger rows whose migration no module provides.
    pub ignore_unknown: bool,
    /// Treat an empty catalog as an error instead of a no-op.
    pub require_migrations: bool,
    /// Append-only JSONL journal of migration runs.
    pub journal: Option<PathBuf>,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            table: "schema_migrations".to_string(),
            ignore_unknown: false,
            require_migrations: false,
            journal: None,
        }
    }
}

/// On-disk contributions assembled into the `local` module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    pub migrations: Option<PathBuf>,
    pub locales: Option<PathBuf>,
}

impl LocalConfig {
    pub fn is_empty(&self) -> bool {
        self.migrations.is_none() && self.locales.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub json: bool,
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

impl Config {
    /// Loads the config file at `path`, or from `ERPKIT_CONFIG`, or
    /// `./erpkit.toml`. Only an explicitly named file is required to exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match env::var(CONFIG_ENV) {
                Ok(p) => (PathBuf::from(p), true),
                Err(env::VarError::NotPresent) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
                Err(e) => return Err(e.into()),
            },
        };

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(ErpkitError::IoError)?;
            Self::from_toml(&content).map_err(|e| {
                ErpkitError::ConfigError(format!("{}: {}", config_path.display(), e))
            })?
        } else if explicit {
            return Err(ErpkitError::ConfigError(format!(
                "config file {} does not exist",
                config_path.display()
            )));
        } else {
            Config::default()
        };

        match env::var(DATABASE_ENV) {
            Ok(db) => config.database = PathBuf::from(db),
            Err(env::VarError::NotPresent) => {}
            Err(e) => return Err(e.into()),
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !identifier_re().is_match(&self.migrations.table) {
            return Err(ErpkitError::ConfigError(format!(
                "migrations.table '{}' is not a valid SQL identifier",
                self.migrations.table
            )));
        }
        if self.default_locale.trim().is_empty() {
            return Err(ErpkitError::ConfigError(
                "default_locale must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the built-in module `name` is enabled.
    pub fn module_enabled(&self, name: &str) -> bool {
        self.modules.is_empty() || self.modules.iter().any(|m| m == name)
    }
}
