//! Migration execution.
//!
//! A plan runs inside exactly one transaction: every script's statements and
//! every ledger change commit together, or nothing does. No retries.

use crate::core::error::{ErpkitError, Result};
use crate::core::ledger;
use crate::core::migration::Direction;
use crate::core::planner::MigrationPlan;
use crate::core::time;
use rusqlite::{Connection, Transaction};
use tracing::{debug, error, info};

/// Applies `plan` against `conn`, recording progress in `table`.
/// Returns the number of scripts applied.
pub fn apply(plan: &MigrationPlan<'_>, conn: &mut Connection, table: &str) -> Result<usize> {
    if plan.is_empty() {
        debug!(direction = %plan.direction, "empty plan; nothing to apply");
        return Ok(0);
    }

    let tx = conn.transaction()?;
    let applied = match run_in(&tx, plan, table) {
        Ok(n) => n,
        Err(e) => {
            // Dropping the transaction rolls back every statement of the plan.
            drop(tx);
            error!(direction = %plan.direction, error = %e, "migration plan rolled back");
            return Err(e);
        }
    };
    tx.commit()?;

    info!(direction = %plan.direction, applied, "migration plan committed");
    Ok(applied)
}

/// Executes `plan` inside an already open transaction without committing.
pub(crate) fn run_in(tx: &Transaction<'_>, plan: &MigrationPlan<'_>, table: &str) -> Result<usize> {
    let mut applied = 0;
    for script in &plan.steps {
        for (idx, stmt) in script.statements(plan.direction).iter().enumerate() {
            tx.execute_batch(stmt).map_err(|source| ErpkitError::ExecutionError {
                script: script.id().to_string(),
                statement: idx + 1,
                source,
            })?;
        }

        let ledger_result = match plan.direction {
            Direction::Up => ledger::insert_record(tx, table, script.id(), &time::now_epoch_z()),
            Direction::Down => ledger::delete_record(tx, table, script.id()).map(|_| ()),
        };
        // Ledger failures are reported against the statement after the script's last one.
        ledger_result.map_err(|source| ErpkitError::ExecutionError {
            script: script.id().to_string(),
            statement: script.statements(plan.direction).len() + 1,
            source,
        })?;

        debug!(id = script.id(), module = script.module(), direction = %plan.direction, "applied migration");
        applied += 1;
    }
    Ok(applied)
}
