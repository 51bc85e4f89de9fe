//! The `warehouse` module: units of measure, positions, products and
//! inventory checks.

use crate::core::error::Result;
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

pub const NAME: &str = "warehouse";

#[derive(RustEmbed)]
#[folder = "migrations/warehouse/"]
#[include = "*.sql"]
struct Migrations;

#[derive(RustEmbed)]
#[folder = "locales/warehouse/"]
#[include = "*.json"]
struct Locales;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub title: String,
    pub short_title: String,
}

/// Units of measure seeded into a fresh database.
#[derive(Debug, Clone)]
pub struct UnitCatalog {
    units: Vec<Unit>,
}

impl UnitCatalog {
    pub fn new(units: Vec<Unit>) -> Self {
        Self { units }
    }

    pub fn find(&self, short_title: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.short_title == short_title)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Default for UnitCatalog {
    fn default() -> Self {
        let unit = |title: &str, short: &str| Unit {
            title: title.to_string(),
            short_title: short.to_string(),
        };
        Self::new(vec![
            unit("Piece", "pcs"),
            unit("Kilogram", "kg"),
            unit("Litre", "l"),
            unit("Metre", "m"),
        ])
    }
}

pub const UNITS: ServiceKey<UnitCatalog> = ServiceKey::new("warehouse.units");

pub struct WarehouseModule;

impl Module for WarehouseModule {
    fn name(&self) -> &str {
        NAME
    }

    fn migration_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        vec![Arc::new(EmbeddedAssets::<Migrations>::new("migrations/warehouse"))]
    }

    fn locale_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        vec![Arc::new(EmbeddedAssets::<Locales>::new("locales/warehouse"))]
    }

    fn permissions(&self) -> Vec<Permission> {
        ["Unit", "Position", "InventoryCheck"]
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
            NavigationItem::new("NavigationLinks.Warehouse", "/warehouse")
                .icon("warehouse")
                .child(NavigationItem::new("NavigationLinks.Positions", "/warehouse/positions").requires("Position.Read"))
                .child(NavigationItem::new("NavigationLinks.Units", "/warehouse/units").requires("Unit.Read"))
                .child(
                    NavigationItem::new("NavigationLinks.Inventory", "/warehouse/inventory")
                        .requires("InventoryCheck.Read"),
                ),
        ]
    }

    fn schema_fragments(&self) -> Vec<SchemaFragment> {
        vec![
            SchemaFragment::new(
                "units",
                r#"type WarehouseUnit {
  id: ID!
  title: String!
  shortTitle: String!
}

extend type Query {
  warehouseUnits: [WarehouseUnit!]!
}
"#,
            ),
            SchemaFragment::new(
                "positions",
                r#"type WarehousePosition {
  id: ID!
  title: String!
  barcode: String!
  unit: WarehouseUnit
  inStock: Int!
}

extend type Query {
  warehousePositions(offset: Int, limit: Int): [WarehousePosition!]!
}
"#,
            ),
        ]
    }

    fn seeds(&self) -> Vec<SeedFn> {
        vec![seed_default_units]
    }

    fn register_services(&self, services: &mut ServiceLocator) -> Result<()> {
        services.register(UNITS, Arc::new(UnitCatalog::default()));
        Ok(())
    }
}

fn seed_default_units(ctx: &SeedContext<'_>) -> Result<()> {
    let units = ctx.services.resolve(UNITS)?;
    let mut stmt = ctx
        .conn
        .prepare("INSERT OR IGNORE INTO warehouse_units (title, short_title) VALUES (?1, ?2)")?;
    for u in units.iter() {
        stmt.execute(params![u.title, u.short_title])?;
    }
    Ok(())
}
