use crate::core::error;
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::Path;

/// Opens the target database with the pragmas the engine relies on.
pub fn db_connect(db_path: &Path) -> Result<Connection, error::ErpkitError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(error::ErpkitError::IoError)?;
    }
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::ErpkitError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::ErpkitError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::ErpkitError::RusqliteError)?;
    Ok(conn)
}

/// Opens the target database for reading. No file, directory or pragma is
/// written; a missing file is read as an empty in-memory database.
pub fn db_open_existing(db_path: &Path) -> Result<Connection, error::ErpkitError> {
    if !db_path.exists() {
        return Ok(Connection::open_in_memory()?);
    }
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::ErpkitError::RusqliteError)?;
    Ok(conn)
}
