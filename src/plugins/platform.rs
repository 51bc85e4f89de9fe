//! The `core` module: users, roles, permissions, tabs and currencies.
//!
//! Every other built-in module assumes this one is registered first.

use crate::core::error::{ErpkitError, Result};
use crate::core::module::{Module, SchemaFragment};
use crate::core::navigation::NavigationItem;
use crate::core::permission::{Action, Permission};
use crate::core::seed::{SeedContext, SeedFn};
use crate::core::services::{ServiceKey, ServiceLocator};
use crate::core::source::{AssetSource, EmbeddedAssets};
use rusqlite::params;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "core";

#[derive(RustEmbed)]
#[folder = "migrations/core/"]
#[include = "*.sql"]
struct Migrations;

#[derive(RustEmbed)]
#[folder = "locales/core/"]
#[include = "*.json"]
struct Locales;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Currency {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
}

/// Currencies known to the platform. Other modules resolve it through
/// [`CURRENCIES`] instead of depending on this module.
#[derive(Debug, Clone)]
pub struct CurrencyCatalog {
    currencies: Vec<Currency>,
}

impl CurrencyCatalog {
    pub fn new(currencies: Vec<Currency>) -> Self {
        Self { currencies }
    }

    pub fn get(&self, code: &str) -> Option<&Currency> {
        self.currencies.iter().find(|c| c.code.eq_ignore_ascii_case(code))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.iter()
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}

impl Default for CurrencyCatalog {
    fn default() -> Self {
        Self::new(vec![
            Currency { code: "USD", name: "US Dollar", symbol: "$" },
            Currency { code: "EUR", name: "Euro", symbol: "€" },
            Currency { code: "RUB", name: "Russian Ruble", symbol: "₽" },
            Currency { code: "UZS", name: "Uzbekistani Som", symbol: "soʻm" },
        ])
    }
}

pub const CURRENCIES: ServiceKey<CurrencyCatalog> = ServiceKey::new("core.currencies");

pub struct PlatformModule;

impl Module for PlatformModule {
    fn name(&self) -> &str {
        NAME
    }

    fn migration_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        vec![Arc::new(EmbeddedAssets::<Migrations>::new("migrations/core"))]
    }

    fn locale_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        vec![Arc::new(EmbeddedAssets::<Locales>::new("locales/core"))]
    }

    fn permissions(&self) -> Vec<Permission> {
        ["User", "Role"]
            .into_iter()
            .flat_map(|resource| {
                [Action::Create, Action::Read, Action::Update, Action::Delete]
                    .into_iter()
                    .map(move |action| Permission::crud(resource, action))
            })
            .collect()
    }

    fn navigation(&self) -> Vec<NavigationItem> {
        vec![
            NavigationItem::new("NavigationLinks.Dashboard", "/").icon("house"),
            NavigationItem::new("NavigationLinks.Administration", "/administration")
                .icon("gear")
                .child(NavigationItem::new("NavigationLinks.Users", "/users").requires("User.Read"))
                .child(NavigationItem::new("NavigationLinks.Roles", "/roles").requires("Role.Read")),
        ]
    }

    fn schema_fragments(&self) -> Vec<SchemaFragment> {
        vec![
            SchemaFragment::new(
                "users",
                r#"type User {
  id: ID!
  firstName: String!
  lastName: String!
  email: String!
  uiLanguage: String!
  roles: [Role!]!
}

extend type Query {
  user(id: ID!): User
  users(offset: Int, limit: Int): [User!]!
}
"#,
            ),
            SchemaFragment::new(
                "roles",
                r#"type Role {
  id: ID!
  name: String!
  description: String
  permissions: [String!]!
}

extend type Query {
  roles: [Role!]!
}
"#,
            ),
        ]
    }

    fn seeds(&self) -> Vec<SeedFn> {
        vec![sync_permissions, seed_currencies]
    }

    fn register_services(&self, services: &mut ServiceLocator) -> Result<()> {
        services.register(CURRENCIES, Arc::new(CurrencyCatalog::default()));
        Ok(())
    }
}

/// Upserts every aggregated permission into the `permissions` table.
fn sync_permissions(ctx: &SeedContext<'_>) -> Result<()> {
    let mut stmt = ctx.conn.prepare(
        "INSERT INTO permissions (name, resource, action, modifier) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO UPDATE SET
            resource = excluded.resource,
            action = excluded.action,
            modifier = excluded.modifier",
    )?;
    for p in ctx.permissions.iter() {
        stmt.execute(params![p.name, p.resource, p.action.to_string(), p.modifier.to_string()])?;
    }
    debug!(permissions = ctx.permissions.len(), "synced permissions table");
    Ok(())
}

fn seed_currencies(ctx: &SeedContext<'_>) -> Result<()> {
    let catalog = ctx.services.resolve(CURRENCIES)?;
    if catalog.is_empty() {
        return Err(ErpkitError::ValidationError("currency catalog is empty".to_string()));
    }
    let mut stmt = ctx
        .conn
        .prepare("INSERT OR IGNORE INTO currencies (code, name, symbol) VALUES (?1, ?2, ?3)")?;
    for c in catalog.iter() {
        stmt.execute(params![c.code, c.name, c.symbol])?;
    }
    Ok(())
}
