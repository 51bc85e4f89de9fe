use rusqlite;
use std::env;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErpkitError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] env::VarError),

    #[error("Parse error in {file} (line {line}): {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },
    #[error("Module '{0}' is already registered")]
    DuplicateModule(String),
    #[error("Migration id '{id}' is contributed twice ({first} and {second})")]
    DuplicateMigrationId {
        id: String,
        first: String,
        second: String,
    },
    #[error("No migrations found in the registered migration sources")]
    NoMigrationsFound,
    #[error("Migration '{0}' is recorded in the ledger but no module provides it")]
    UnknownMigration(String),
    #[error("Migration '{script}' failed at statement #{statement}: {source}")]
    ExecutionError {
        script: String,
        statement: usize,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Service '{0}' is not registered")]
    UnresolvedService(String),
    #[error("Service '{0}' is registered with a different type than requested")]
    ServiceTypeMismatch(String),
    #[error("Permission '{name}' is declared with conflicting definitions by {first} and {second}")]
    PermissionConflict {
        name: String,
        first: String,
        second: String,
    },
    #[error("Module registry is frozen; cannot register '{0}' after bootstrap reads")]
    RegistryFrozen(String),
    #[error("Locale file {file} is invalid: {reason}")]
    LocaleError { file: String, reason: String },
    #[error("Message '{id}' is missing for locale '{locale}'")]
    MissingMessage { locale: String, id: String },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ErpkitError>;

impl From<toml::de::Error> for ErpkitError {
    fn from(e: toml::de::Error) -> Self {
        ErpkitError::ConfigError(e.to_string())
    }
}
