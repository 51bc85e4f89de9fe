use erpkit::core::application::{AppBuilder, Application, Rollback};
use erpkit::core::config::Config;
use erpkit::core::db;
use erpkit::core::error::ErpkitError;
use erpkit::core::journal::MigrationJournal;
use erpkit::core::ledger::MemoryLedger;
use erpkit::core::migration::Direction;
use erpkit::core::module::Module;
use erpkit::core::planner::{self, PlanOptions};
use erpkit::core::services::ServiceKey;
use erpkit::core::source::{AssetSource, MemoryAssets};
use erpkit::plugins::local::LocalModule;
use rusqlite::Connection;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

struct Fixture {
    name: &'static str,
    migrations: Vec<(&'static str, &'static str)>,
    locales: Vec<(&'static str, &'static str)>,
}

impl Fixture {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            migrations: Vec::new(),
            locales: Vec::new(),
        }
    }

    fn migration(mut self, path: &'static str, sql: &'static str) -> Self {
        self.migrations.push((path, sql));
        self
    }

    fn locale(mut self, path: &'static str, json: &'static str) -> Self {
        self.locales.push((path, json));
        self
    }
}

fn assets(label: &str, files: &[(&'static str, &'static str)]) -> Vec<Arc<dyn AssetSource>> {
    if files.is_empty() {
        return Vec::new();
    }
    let memory = files
        .iter()
        .fold(MemoryAssets::new(label), |acc, (path, contents)| acc.with_file(*path, *contents));
    vec![Arc::new(memory)]
}

impl Module for Fixture {
    fn name(&self) -> &str {
        self.name
    }

    fn migration_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        assets(self.name, &self.migrations)
    }

    fn locale_sources(&self) -> Vec<Arc<dyn AssetSource>> {
        assets(self.name, &self.locales)
    }
}

const INIT: &str = "-- +migrate Up\nCREATE TABLE a (id INTEGER PRIMARY KEY);\n-- +migrate Down\nDROP TABLE a;\n";
const ADD_COL: &str = "-- +migrate Up\nALTER TABLE a ADD COLUMN name TEXT;\n-- +migrate Down\nALTER TABLE a DROP COLUMN name;\n";
const INIT_B: &str = "-- +migrate Up\nCREATE TABLE b (id INTEGER PRIMARY KEY);\n-- +migrate Down\nDROP TABLE b;\n";

fn module_a() -> Fixture {
    Fixture::new("a")
        .migration("0002_add_col.sql", ADD_COL)
        .migration("0001_init.sql", INIT)
}

fn module_b() -> Fixture {
    Fixture::new("b").migration("0001_init_b.sql", INIT_B)
}

fn build(config: Config, modules: &[&dyn Module]) -> Result<Application, ErpkitError> {
    let mut builder = AppBuilder::new(config);
    for m in modules {
        builder.register(*m)?;
    }
    builder.build()
}

fn connect(dir: &Path) -> Connection {
    db::db_connect(&dir.join("app.db")).expect("db connect")
}

fn ledger_ids(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT id FROM schema_migrations ORDER BY id")
        .expect("prepare ledger query");
    stmt.query_map([], |row| row.get(0))
        .expect("query ledger")
        .collect::<Result<Vec<String>, _>>()
        .expect("read ledger")
}

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .expect("sqlite_master")
        == 1
}

#[test]
fn catalog_follows_registration_order_and_apply_is_idempotent() {
    let tmp = tempdir().expect("tempdir");
    let app = build(Config::default(), &[&module_a(), &module_b()]).expect("bootstrap");

    let ids: Vec<&str> = app.catalog().iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec!["0001_init", "0002_add_col", "0001_init_b"]);

    let mut conn = connect(tmp.path());
    let plan = app.plan(&conn, Direction::Up, 0).expect("plan up");
    assert_eq!(plan.ids(), vec!["0001_init", "0002_add_col", "0001_init_b"]);

    let report = app.migrate_up(&mut conn, 0).expect("migrate up");
    assert_eq!(report.applied, 3);
    assert_eq!(ledger_ids(&conn), vec!["0001_init", "0001_init_b", "0002_add_col"]);
    assert!(table_exists(&conn, "a"));
    assert!(table_exists(&conn, "b"));

    assert!(app.plan(&conn, Direction::Up, 0).expect("re-plan").is_empty());
    assert_eq!(app.migrate_up(&mut conn, 0).expect("second run").applied, 0);
}

#[test]
fn up_limit_applies_a_prefix() {
    let tmp = tempdir().expect("tempdir");
    let app = build(Config::default(), &[&module_a(), &module_b()]).expect("bootstrap");
    let mut conn = connect(tmp.path());

    let report = app.migrate_up(&mut conn, 2).expect("migrate up");
    assert_eq!(report.ids, vec!["0001_init", "0002_add_col"]);
    assert_eq!(app.plan(&conn, Direction::Up, 0).expect("plan").ids(), vec!["0001_init_b"]);
}

#[test]
fn down_with_limit_one_reverts_only_the_latest() {
    let scripts = build(Config::default(), &[&module_a()])
        .expect("bootstrap")
        .catalog()
        .to_vec();
    let ledger = MemoryLedger::with_applied(["0001_init", "0002_add_col"]);
    let plan = planner::plan(&scripts, &ledger, Direction::Down, PlanOptions::limit(1)).expect("plan down");
    assert_eq!(plan.ids(), vec!["0002_add_col"]);

    let tmp = tempdir().expect("tempdir");
    let app = build(Config::default(), &[&module_a(), &module_b()]).expect("bootstrap");
    let mut conn = connect(tmp.path());
    app.migrate_up(&mut conn, 0).expect("migrate up");

    let report = app.rollback(&mut conn, Rollback::default()).expect("rollback");
    assert_eq!(report.ids, vec!["0001_init_b"]);
    assert_eq!(ledger_ids(&conn), vec!["0001_init", "0002_add_col"]);
    assert!(!table_exists(&conn, "b"));
    assert!(table_exists(&conn, "a"));

    let steps = NonZeroUsize::new(1).expect("non-zero");
    let report = app.rollback(&mut conn, Rollback::Steps(steps)).expect("rollback");
    assert_eq!(report.ids, vec!["0002_add_col"]);
    assert_eq!(ledger_ids(&conn), vec!["0001_init"]);

    app.rollback(&mut conn, Rollback::All).expect("rollback all");
    assert!(ledger_ids(&conn).is_empty());
    assert!(!table_exists(&conn, "a"));
}

#[test]
fn failing_statement_rolls_back_the_whole_plan() {
    let tmp = tempdir().expect("tempdir");
    let broken = Fixture::new("broken").migration(
        "0003_broken.sql",
        "-- +migrate Up\nCREATE TABLE c (id INTEGER);\nINSERT INTO missing_table VALUES (1);\n",
    );
    let app = build(Config::default(), &[&module_a(), &broken]).expect("bootstrap");
    let mut conn = connect(tmp.path());

    let err = app.migrate_up(&mut conn, 0).expect_err("plan must fail");
    match err {
        ErpkitError::ExecutionError { script, statement, .. } => {
            assert_eq!(script, "0003_broken");
            assert_eq!(statement, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(ledger_ids(&conn).is_empty());
    assert!(!table_exists(&conn, "a"));
    assert!(!table_exists(&conn, "c"));
}

#[test]
fn duplicate_modules_and_migration_ids_fail_bootstrap() {
    let err = build(Config::default(), &[&module_a(), &module_a()])
        .err()
        .expect("duplicate module must fail");
    assert!(matches!(err, ErpkitError::DuplicateModule(ref name) if name == "a"));

    let clash = Fixture::new("clash").migration("nested/0001_init.sql", INIT);
    let other = Fixture::new("other").migration("0001_init.sql", INIT);
    let err = build(Config::default(), &[&module_a(), &other, &clash])
        .err()
        .expect("duplicate id must fail");
    match err {
        ErpkitError::DuplicateMigrationId { id, first, second } => {
            assert_eq!(id, "0001_init");
            assert!(first.starts_with("a "));
            assert!(second.starts_with("other "));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn parse_error_names_the_file() {
    let bad = Fixture::new("bad").migration("0001_bad.sql", "CREATE TABLE x (id INTEGER);\n");
    let err = build(Config::default(), &[&bad]).err().expect("parse must fail");
    assert!(matches!(err, ErpkitError::ParseError { .. }));
    assert!(err.to_string().contains("0001_bad.sql"));
}

#[test]
fn unknown_ledger_rows_are_rejected_unless_ignored() {
    let tmp = tempdir().expect("tempdir");
    let app = build(Config::default(), &[&module_a()]).expect("bootstrap");
    let mut conn = connect(tmp.path());
    app.migrate_up(&mut conn, 0).expect("migrate up");
    conn.execute(
        "INSERT INTO schema_migrations (id, applied_at) VALUES ('9999_gone', '1Z')",
        [],
    )
    .expect("insert stray row");

    let err = app.plan(&conn, Direction::Up, 0).err().expect("unknown row");
    assert!(matches!(err, ErpkitError::UnknownMigration(ref id) if id == "9999_gone"));

    let status = app.migration_status(&conn).expect("status");
    assert_eq!(status.unknown.len(), 1);
    assert_eq!(status.pending(), 0);

    let mut config = Config::default();
    config.migrations.ignore_unknown = true;
    let lenient = build(config, &[&module_a()]).expect("bootstrap");
    assert!(lenient.plan(&conn, Direction::Up, 0).expect("plan").is_empty());
}

#[test]
fn redo_reapplies_latest_in_place() {
    let tmp = tempdir().expect("tempdir");
    let app = build(Config::default(), &[&module_a()]).expect("bootstrap");
    let mut conn = connect(tmp.path());
    app.migrate_up(&mut conn, 0).expect("migrate up");

    let report = app.redo(&mut conn).expect("redo");
    assert_eq!(report.ids, vec!["0002_add_col"]);
    assert_eq!(report.applied, 1);
    assert_eq!(ledger_ids(&conn), vec!["0001_init", "0002_add_col"]);
    conn.execute("INSERT INTO a (id, name) VALUES (1, 'x')", [])
        .expect("column exists again");
}

#[test]
fn journal_records_each_run() {
    let tmp = tempdir().expect("tempdir");
    let journal_path = tmp.path().join("logs/migrations.jsonl");
    let mut config = Config::default();
    config.migrations.journal = Some(journal_path.clone());
    let app = build(config, &[&module_a()]).expect("bootstrap");
    let mut conn = connect(tmp.path());

    app.migrate_up(&mut conn, 0).expect("migrate up");
    app.rollback(&mut conn, Rollback::default()).expect("rollback");

    let events = MigrationJournal::new(&journal_path).events().expect("events");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].op, "migrate.up");
    assert_eq!(events[0].ids, vec!["0001_init", "0002_add_col"]);
    assert_eq!(events[0].checksums.len(), 2);
    assert_eq!(events[1].direction, "down");
    assert_eq!(events[1].status, "success");
}

#[test]
fn services_resolve_the_last_registration() {
    struct Clock(u64);
    const CLOCK: ServiceKey<Clock> = ServiceKey::new("test.clock");
    const MAILER: ServiceKey<String> = ServiceKey::new("test.mailer");

    let mut builder = AppBuilder::new(Config::default());
    let first = Arc::new(Clock(1));
    let second = Arc::new(Clock(2));
    builder.services_mut().register(CLOCK, first);
    builder.services_mut().register(CLOCK, second.clone());
    let app = builder.build().expect("bootstrap");

    let resolved = app.services().resolve(CLOCK).expect("clock");
    assert!(Arc::ptr_eq(&resolved, &second));
    assert_eq!(resolved.0, 2);

    let err = app.services().resolve(MAILER).err().expect("missing service");
    assert!(matches!(err, ErpkitError::UnresolvedService(ref name) if name == "test.mailer"));
}

#[test]
fn later_modules_override_locale_messages() {
    let a = Fixture::new("a")
        .locale("en.json", r#"{"Greeting": "Hello", "Farewell": "Bye"}"#)
        .locale("ru.json", r#"{"Greeting": "Привет"}"#);
    let b = Fixture::new("b").locale("en.json", r#"{"Greeting": {"one": "Hey", "other": "Hey all"}}"#);
    let app = build(Config::default(), &[&a, &b]).expect("bootstrap");

    let locales = app.locales();
    assert_eq!(locales.localize("en", "Greeting").expect("en"), "Hey all");
    assert_eq!(locales.localize("ru", "Greeting").expect("ru"), "Привет");
    assert_eq!(locales.localize("ru", "Farewell").expect("fallback"), "Bye");
    assert!(matches!(
        locales.localize("ru", "Missing"),
        Err(ErpkitError::MissingMessage { .. })
    ));

    let shadowed = locales.shadowed();
    assert_eq!(shadowed.len(), 1);
    assert_eq!(shadowed[0].overridden, "a");
    assert_eq!(shadowed[0].by, "b");
}

#[test]
fn local_module_reads_nested_directories() {
    let tmp = tempdir().expect("tempdir");
    let dir = tmp.path().join("local_migrations");
    fs::create_dir_all(dir.join("2024")).expect("mkdir");
    fs::write(dir.join("2024/0001_notes.sql"), "-- +migrate Up\nCREATE TABLE notes (id INTEGER);\n").expect("write");
    fs::write(dir.join("README.md"), "not a migration").expect("write");

    let mut config = Config::default();
    config.local.migrations = Some(dir);
    let local = LocalModule::from_config(&config.local);
    let app = build(config, &[&module_a(), &local]).expect("bootstrap");

    let ids: Vec<&str> = app.catalog().iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec!["0001_init", "0002_add_col", "2024/0001_notes"]);
    assert_eq!(app.catalog()[2].module(), "local");

    let mut conn = connect(tmp.path());
    assert_eq!(app.migrate_up(&mut conn, 0).expect("migrate up").applied, 3);
    // No down section: rolling back only forgets the ledger row.
    app.rollback(&mut conn, Rollback::default()).expect("rollback");
    assert!(table_exists(&conn, "notes"));
    assert_eq!(ledger_ids(&conn), vec!["0001_init", "0002_add_col"]);
}

#[test]
fn application_is_shared_across_threads() {
    const NAME: ServiceKey<String> = ServiceKey::new("test.name");
    let mut builder = AppBuilder::new(Config::default());
    builder.register(&module_a()).expect("register");
    builder.services_mut().register(NAME, Arc::new("erp".to_string()));
    let app = Arc::new(builder.build().expect("bootstrap"));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let app = Arc::clone(&app);
            std::thread::spawn(move || {
                let name = app.services().resolve(NAME).expect("resolve");
                (name.len(), app.catalog().len())
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().expect("thread"), (3, 2));
    }
}
