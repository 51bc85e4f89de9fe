use crate::core::error::{ErpkitError, Result};
use crate::core::migration::Direction;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL record of migration runs. One line per execution
/// attempt, written after the transaction commits or rolls back.
pub struct MigrationJournal {
    path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JournalEvent {
    pub ts: String,
    pub event_id: String,
    pub op: String,
    pub direction: String,
    pub ids: Vec<String>,
    pub checksums: Vec<String>,
    pub status: String,
    pub applied: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a run tried to do and how it ended.
pub struct RunOutcome<'a> {
    pub op: &'a str,
    pub direction: Direction,
    pub ids: Vec<String>,
    pub checksums: Vec<String>,
    pub result: std::result::Result<usize, &'a ErpkitError>,
}

impl MigrationJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, outcome: RunOutcome<'_>) -> Result<JournalEvent> {
        let (status, applied, error) = match outcome.result {
            Ok(n) => ("success", n, None),
            Err(e) => ("error", 0, Some(e.to_string())),
        };
        let ev = JournalEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            op: outcome.op.to_string(),
            direction: outcome.direction.to_string(),
            ids: outcome.ids,
            checksums: outcome.checksums,
            status: status.to_string(),
            applied,
            error,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ErpkitError::IoError)?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(ErpkitError::IoError)?;
        writeln!(f, "{}", serde_json::to_string(&ev)?).map_err(ErpkitError::IoError)?;
        Ok(ev)
    }

    /// Reads every event back, oldest first.
    pub fn events(&self) -> Result<Vec<JournalEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(ErpkitError::JsonError))
            .collect()
    }
}
