//! The applied-migrations ledger.
//!
//! The ledger lives in the target database and is re-read on every run; the
//! process never caches it. Presence of a row means the script's "up"
//! statements were committed.

use crate::core::error::{ErpkitError, Result};
use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    pub id: String,
    pub applied_at: String,
}

/// Read-only view of the ledger used by the planner.
pub trait LedgerReader {
    /// All records, in no particular order.
    fn records(&self) -> Result<Vec<MigrationRecord>>;
}

/// Ledger stored in a SQLite table.
pub struct SqliteLedger<'a> {
    conn: &'a Connection,
    table: &'a str,
}

impl<'a> SqliteLedger<'a> {
    /// `table` must already be validated as a plain SQL identifier.
    pub fn new(conn: &'a Connection, table: &'a str) -> Self {
        Self { conn, table }
    }

    pub fn ensure_table(&self) -> Result<()> {
        ensure_table(self.conn, self.table)
    }
}

impl LedgerReader for SqliteLedger<'_> {
    fn records(&self) -> Result<Vec<MigrationRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, applied_at FROM {} ORDER BY id", self.table))?;
        let rows = stmt.query_map([], |row| {
            Ok(MigrationRecord {
                id: row.get(0)?,
                applied_at: row.get(1)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(ErpkitError::RusqliteError)
    }
}

pub fn ensure_table(conn: &Connection, table: &str) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        table
    ))?;
    Ok(())
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

pub(crate) fn insert_record(conn: &Connection, table: &str, id: &str, applied_at: &str) -> rusqlite::Result<()> {
    conn.execute(
        &format!("INSERT INTO {} (id, applied_at) VALUES (?1, ?2)", table),
        params![id, applied_at],
    )?;
    Ok(())
}

pub(crate) fn delete_record(conn: &Connection, table: &str, id: &str) -> rusqlite::Result<usize> {
    conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])
}

/// In-memory ledger for planning without a database.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    records: BTreeMap<String, String>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_applied<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ledger = Self::new();
        for id in ids {
            ledger.records.insert(id.into(), "0Z".to_string());
        }
        ledger
    }
}

impl LedgerReader for MemoryLedger {
    fn records(&self) -> Result<Vec<MigrationRecord>> {
        Ok(self
            .records
            .iter()
            .map(|(id, applied_at)| MigrationRecord {
                id: id.clone(),
                applied_at: applied_at.clone(),
            })
            .collect())
    }
}
