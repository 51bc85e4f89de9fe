//! The `local` module: deployment-specific migrations and locale overrides
//! read from directories named in the config.

use crate::core::config::LocalConfig;
use crate::core::module::Module;
use crate::core::source::{AssetSource, DirAssets};
use std::path::PathBuf;
use std::sync::Arc;

pub const NAME: &str = "local";

#[derive(Debug, Clone, Default)]
pub struct LocalModule {
    migrations: Option<PathBuf>,
    locales: Option<PathBuf>,
}

impl LocalModule {
    pub fn from_config(config: &LocalConfig) -> Self {
        Self {
            migrations: config.migrations.clone(),
            locales: config.locales.clone(),
        }
    }
}

impl Module for LocalModule {
    fn name(&self) -> &str {
        NAME
    }

    fn migration_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        self.migrations
            .iter()
            .map(|dir| Arc::new(DirAssets::new(dir)) as Arc<dyn AssetSource>)
            .collect()
    }

    fn locale_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        self.locales
            .iter()
            .map(|dir| Arc::new(DirAssets::new(dir)) as Arc<dyn AssetSource>)
            .collect()
    }
}
