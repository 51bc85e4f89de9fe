//! The engine: migrations, module composition and the aggregators built on
//! top of the module registry.

pub mod application;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod journal;
pub mod ledger;
pub mod locale;
pub mod logging;
pub mod migration;
pub mod module;
pub mod navigation;
pub mod permission;
pub mod planner;
pub mod seed;
pub mod services;
pub mod source;
pub mod time;
