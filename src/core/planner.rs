//! Migration planning.
//!
//! `plan` is a pure function of the catalog, the ledger contents, the
//! direction and the limit. It reads the ledger and nothing else.

use crate::core::error::{ErpkitError, Result};
use crate::core::ledger::LedgerReader;
use crate::core::migration::{Direction, MigrationScript};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Ordered scripts to execute in one direction. Borrowed from the catalog
/// and never persisted.
#[derive(Debug, Clone)]
pub struct MigrationPlan<'a> {
    pub direction: Direction,
    pub steps: Vec<&'a MigrationScript>,
}

impl<'a> MigrationPlan<'a> {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.steps.iter().map(|s| s.id()).collect()
    }
}

/// Planning bounds.
///
/// For `Up`, `limit == 0` plans every pending script. For `Down`,
/// `limit == 0` plans a single step unless `all` is set: reverting the
/// whole ledger is never the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions {
    /// Maximum number of steps.
    pub limit: usize,
    /// Lift the limit for `Down`.
    pub all: bool,
    /// Skip the check that every ledger row has a matching script.
    pub ignore_unknown: bool,
}

impl PlanOptions {
    pub fn limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    fn max_steps(&self, direction: Direction) -> Option<usize> {
        match direction {
            _ if self.limit > 0 => Some(self.limit),
            Direction::Up => None,
            Direction::Down if self.all => None,
            Direction::Down => Some(1),
        }
    }
}

/// Computes the plan.
///
/// - `Up`: scripts without a ledger record, in catalog order.
/// - `Down`: scripts with a ledger record, in reverse catalog order.
///
/// A ledger record with no matching script fails with `UnknownMigration`
/// unless `ignore_unknown` is set.
pub fn plan<'a>(
    scripts: &'a [MigrationScript],
    ledger: &dyn LedgerReader,
    direction: Direction,
    options: PlanOptions,
) -> Result<MigrationPlan<'a>> {
    let records = ledger.records()?;
    let applied: FxHashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();

    if !options.ignore_unknown {
        let known: FxHashSet<&str> = scripts.iter().map(|s| s.id()).collect();
        // Sorted so the reported ID does not depend on ledger read order.
        let mut unknown: Vec<&str> = applied.iter().copied().filter(|id| !known.contains(id)).collect();
        unknown.sort_unstable();
        if let Some(id) = unknown.first() {
            return Err(ErpkitError::UnknownMigration(id.to_string()));
        }
    }

    let mut steps: Vec<&'a MigrationScript> = match direction {
        Direction::Up => scripts.iter().filter(|s| !applied.contains(s.id())).collect(),
        Direction::Down => scripts.iter().rev().filter(|s| applied.contains(s.id())).collect(),
    };
    if let Some(max) = options.max_steps(direction) {
        steps.truncate(max);
    }

    debug!(%direction, steps = steps.len(), applied = applied.len(), "planned migrations");
    Ok(MigrationPlan { direction, steps })
}
