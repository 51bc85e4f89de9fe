use erpkit::core::application::Rollback;
use erpkit::core::config::Config;
use erpkit::core::db;
use erpkit::core::migration::Direction;
use erpkit::plugins::{self, warehouse};
use rusqlite::Connection;
use std::num::NonZeroUsize;
use tempfile::tempdir;

fn warehouse_only() -> Config {
    let mut config = Config::default();
    config.modules = vec![warehouse::NAME.to_string()];
    config
}

fn unit_titles(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT short_title FROM warehouse_units ORDER BY id")
        .expect("prepare");
    stmt.query_map([], |row| row.get(0))
        .expect("query")
        .collect::<Result<Vec<String>, _>>()
        .expect("rows")
}

#[test]
fn warehouse_runs_standalone_and_seeds_units() {
    let tmp = tempdir().expect("tempdir");
    let app = plugins::bootstrap(warehouse_only()).expect("bootstrap");
    let mut conn = db::db_connect(&tmp.path().join("wh.db")).expect("db connect");

    let report = app.migrate_up(&mut conn, 0).expect("migrate up");
    assert_eq!(
        report.ids,
        vec!["20240215140000_units", "20240215140500_positions", "20240301090000_inventory"]
    );

    assert_eq!(app.seed(&mut conn).expect("seed"), 1);
    assert_eq!(unit_titles(&conn), vec!["pcs", "kg", "l", "m"]);

    let units = app.services().resolve(warehouse::UNITS).expect("units service");
    assert_eq!(units.len(), 4);
}

#[test]
fn warehouse_rolls_back_before_core() {
    let tmp = tempdir().expect("tempdir");
    let app = plugins::bootstrap(Config::default()).expect("bootstrap");
    let mut conn = db::db_connect(&tmp.path().join("erp.db")).expect("db connect");
    app.migrate_up(&mut conn, 0).expect("migrate up");

    let plan = app.dry_run(&conn, Direction::Down, 3).expect("dry run");
    assert!(plan.dry_run);
    assert_eq!(
        plan.ids,
        vec!["20240301090000_inventory", "20240215140500_positions", "20240215140000_units"]
    );

    let steps = NonZeroUsize::new(3).expect("non-zero");
    let report = app.rollback(&mut conn, Rollback::Steps(steps)).expect("rollback");
    assert_eq!(report.applied, 3);

    let status = app.migration_status(&conn).expect("status");
    assert_eq!(status.pending(), 3);
    assert!(
        status
            .scripts
            .iter()
            .filter(|s| s.applied_at.is_none())
            .all(|s| s.module == "warehouse")
    );
}

#[test]
fn inventory_results_cascade_with_checks() {
    let tmp = tempdir().expect("tempdir");
    let app = plugins::bootstrap(warehouse_only()).expect("bootstrap");
    let mut conn = db::db_connect(&tmp.path().join("wh.db")).expect("db connect");
    app.migrate_up(&mut conn, 0).expect("migrate up");

    conn.execute_batch(
        "INSERT INTO warehouse_units (title, short_title) VALUES ('Piece', 'pcs');
         INSERT INTO warehouse_positions (title, barcode, unit_id) VALUES ('Bolt', '0001', 1);
         INSERT INTO inventory_checks (name) VALUES ('Q1');
         INSERT INTO inventory_check_results (inventory_check_id, position_id, expected_quantity, actual_quantity, difference)
             VALUES (1, 1, 10, 8, -2);
         DELETE FROM inventory_checks WHERE id = 1;",
    )
    .expect("fixture rows");
    let left: i64 = conn
        .query_row("SELECT COUNT(*) FROM inventory_check_results", [], |row| row.get(0))
        .expect("count");
    assert_eq!(left, 0);
}
