use erpkit::core::config::Config;
use erpkit::core::db;
use erpkit::core::error::ErpkitError;
use erpkit::plugins::{self, platform};
use rusqlite::Connection;
use std::collections::HashSet;
use std::fs;
use tempfile::tempdir;

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .expect("count rows")
}

#[test]
fn builtin_modules_migrate_and_seed() {
    let tmp = tempdir().expect("tempdir");
    let app = plugins::bootstrap(Config::default()).expect("bootstrap");
    assert_eq!(app.registry().names(), vec!["core", "crm", "warehouse"]);
    assert_eq!(app.catalog()[0].module(), "core");

    let mut conn = db::db_connect(&tmp.path().join("erp.db")).expect("db connect");
    let report = app.migrate_up(&mut conn, 0).expect("migrate up");
    assert_eq!(report.applied, app.catalog().len());

    assert_eq!(app.seed(&mut conn).expect("seed"), 3);
    assert_eq!(count(&conn, "permissions"), app.permissions().len() as i64);
    assert_eq!(count(&conn, "currencies"), 4);

    // Seeds are idempotent.
    app.seed(&mut conn).expect("seed again");
    assert_eq!(count(&conn, "permissions"), app.permissions().len() as i64);
    assert_eq!(count(&conn, "currencies"), 4);

    let action: String = conn
        .query_row("SELECT action FROM permissions WHERE name = 'Client.Update'", [], |row| row.get(0))
        .expect("client permission");
    assert_eq!(action, "update");
}

#[test]
fn seed_before_migrate_fails_without_side_effects() {
    let tmp = tempdir().expect("tempdir");
    let app = plugins::bootstrap(Config::default()).expect("bootstrap");
    let mut conn = db::db_connect(&tmp.path().join("erp.db")).expect("db connect");
    assert!(app.seed(&mut conn).is_err());
    let tables: i64 = conn
        .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |row| row.get(0))
        .expect("sqlite_master");
    assert_eq!(tables, 0);
}

#[test]
fn currency_service_is_published() {
    let app = plugins::bootstrap(Config::default()).expect("bootstrap");
    let currencies = app.services().resolve(platform::CURRENCIES).expect("currencies");
    assert_eq!(currencies.get("EUR").map(|c| c.symbol), Some("€"));
}

#[test]
fn navigation_is_translated_and_filtered() {
    let app = plugins::bootstrap(Config::default()).expect("bootstrap");

    let en = app.navigation("en").expect("en navigation");
    assert_eq!(en[0].name, "Dashboard");
    assert_eq!(en[1].children[0].name, "Users");

    let ru = app.navigation("ru").expect("ru navigation");
    assert_eq!(ru[1].children[0].name, "Пользователи");

    let granted: HashSet<&str> = ["User.Read"].into_iter().collect();
    let admin = en[1].visible_to(&granted).expect("admin visible");
    assert_eq!(admin.children.len(), 1);
    assert_eq!(admin.children[0].href, "/users");

    // Unknown locales fall back to the default locale.
    let de = app.navigation("de").expect("fallback navigation");
    assert_eq!(de[0].name, "Dashboard");
}

#[test]
fn module_list_in_config_filters_builtins() {
    let mut config = Config::default();
    config.modules = vec!["core".to_string()];
    let app = plugins::bootstrap(config).expect("bootstrap");
    assert_eq!(app.registry().names(), vec!["core"]);
    assert!(app.catalog().iter().all(|s| s.module() == "core"));

    let mut config = Config::default();
    config.modules = vec!["core".to_string(), "billing".to_string()];
    let err = plugins::bootstrap(config).err().expect("unknown module");
    assert!(matches!(err, ErpkitError::ConfigError(ref msg) if msg.contains("billing")));
}

#[test]
fn schema_fragments_keep_registration_order() {
    let app = plugins::bootstrap(Config::default()).expect("bootstrap");
    let sdl = app.schema_sdl();
    let user = sdl.find("type User").expect("user type");
    let client = sdl.find("type Client").expect("client type");
    let unit = sdl.find("type WarehouseUnit").expect("unit type");
    assert!(user < client && client < unit);
}

#[test]
fn local_locales_override_builtin_strings() {
    let tmp = tempdir().expect("tempdir");
    let locales = tmp.path().join("locales");
    fs::create_dir_all(&locales).expect("mkdir");
    fs::write(locales.join("en.json"), r#"{"NavigationLinks.Users": "People"}"#).expect("write");

    let mut config = Config::default();
    config.local.locales = Some(locales);
    let app = plugins::bootstrap(config).expect("bootstrap");
    assert_eq!(app.registry().names().last(), Some(&"local"));

    let en = app.navigation("en").expect("en navigation");
    assert_eq!(en[1].children[0].name, "People");
    assert!(
        app.locales()
            .shadowed()
            .iter()
            .any(|s| s.id == "NavigationLinks.Users" && s.overridden == "core" && s.by == "local")
    );
}
