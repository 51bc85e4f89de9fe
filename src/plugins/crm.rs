//! The `crm` module: clients and client contacts.

use crate::core::module::{Module, SchemaFragment};
use crate::core::navigation::NavigationItem;
use crate::core::permission::{Action, Permission};
use crate::core::source::{AssetSource, EmbeddedAssets};
use rust_embed::RustEmbed;
use std::sync::Arc;

pub const NAME: &str = "crm";

#[derive(RustEmbed)]
#[folder = "migrations/crm/"]
#[include = "*.sql"]
struct Migrations;

#[derive(RustEmbed)]
#[folder = "locales/crm/"]
#[include = "*.json"]
struct Locales;

pub struct CrmModule;

impl Module for CrmModule {
    fn name(&self) -> &str {
        NAME
    }

    fn migration_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        vec![Arc::new(EmbeddedAssets::<Migrations>::new("migrations/crm"))]
    }

    fn locale_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        vec![Arc::new(EmbeddedAssets::<Locales>::new("locales/crm"))]
    }

    fn permissions(&self) -> Vec<Permission> {
        [Action::Create, Action::Read, Action::Update, Action::Delete]
            .into_iter()
            .map(|action| Permission::crud("Client", action))
            .collect()
    }

    fn navigation(&self) -> Vec<NavigationItem> {
        vec![
            NavigationItem::new("NavigationLinks.CRM", "/crm")
                .icon("users")
                .child(NavigationItem::new("NavigationLinks.Clients", "/crm/clients").requires("Client.Read")),
        ]
    }

    fn schema_fragments(&self) -> Vec<SchemaFragment> {
        vec![SchemaFragment::new(
            "clients",
            r#"type Client {
  id: ID!
  firstName: String!
  lastName: String
  middleName: String
  phoneNumber: String!
  email: String
  contacts: [ClientContact!]!
}

type ClientContact {
  id: ID!
  type: String!
  value: String!
}

extend type Query {
  client(id: ID!): Client
  clients(offset: Int, limit: Int): [Client!]!
}
"#,
        )]
    }
}
