//! Built-in feature modules.
//!
//! Registration order is fixed: `core`, `crm`, `warehouse`, then the
//! config-driven `local` module so its locale strings win.

pub mod crm;
pub mod local;
pub mod platform;
pub mod warehouse;

use crate::core::application::{AppBuilder, Application};
use crate::core::config::Config;
use crate::core::error::{ErpkitError, Result};
use crate::core::module::Module;

pub fn builtin_modules() -> Vec<Box<dyn Module>> {
    vec![
        Box::new(platform::PlatformModule),
        Box::new(crm::CrmModule),
        Box::new(warehouse::WarehouseModule),
    ]
}

/// Built-in modules enabled by `config`, followed by the local module when
/// configured. Naming a module that does not exist is a config error.
pub fn enabled_modules(config: &Config) -> Result<Vec<Box<dyn Module>>> {
    let builtins = builtin_modules();
    if let Some(unknown) = config
        .modules
        .iter()
        .find(|name| !builtins.iter().any(|m| m.name() == name.as_str()))
    {
        return Err(ErpkitError::ConfigError(format!(
            "unknown module '{}' (available: {})",
            unknown,
            builtins.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
        )));
    }

    let mut modules: Vec<Box<dyn Module>> = builtins
        .into_iter()
        .filter(|m| config.module_enabled(m.name()))
        .collect();
    if !config.local.is_empty() {
        modules.push(Box::new(local::LocalModule::from_config(&config.local)));
    }
    Ok(modules)
}

/// Registers the enabled modules and builds the application.
pub fn bootstrap(config: Config) -> Result<Application> {
    let modules = enabled_modules(&config)?;
    let mut builder = AppBuilder::new(config);
    for module in &modules {
        builder.register(module.as_ref())?;
    }
    builder.build()
}
