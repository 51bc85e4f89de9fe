//! Permission declarations and their aggregation across modules.

use crate::core::error::{ErpkitError, Result};
use crate::core::module::Contribution;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    All,
    Own,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Modifier::All => "all",
            Modifier::Own => "own",
        })
    }
}

/// A named permission over `(resource, action, modifier)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub name: String,
    pub resource: String,
    pub action: Action,
    pub modifier: Modifier,
}

impl Permission {
    pub fn new(name: impl Into<String>, resource: impl Into<String>, action: Action, modifier: Modifier) -> Self {
        Self {
            name: name.into(),
            resource: resource.into(),
            action,
            modifier,
        }
    }

    /// `<Resource>.<Action>` with an `All` modifier, the naming the built-in
    /// modules use (e.g. `Client.Create`).
    pub fn crud(resource: &str, action: Action) -> Self {
        let verb = match action {
            Action::Create => "Create",
            Action::Read => "Read",
            Action::Update => "Update",
            Action::Delete => "Delete",
        };
        Self::new(format!("{}.{}", resource, verb), resource.to_lowercase(), action, Modifier::All)
    }
}

/// Aggregated permissions, in first-declaration order.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    permissions: Vec<Permission>,
    declared_by: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl PermissionSet {
    /// Folds module declarations into one set. Identical re-declarations are
    /// ignored; the same name with a different tuple is a `PermissionConflict`.
    pub fn build(declarations: &[Contribution<Permission>]) -> Result<Self> {
        let mut set = PermissionSet::default();
        for decl in declarations {
            match set.index.get(&decl.item.name) {
                Some(&idx) if set.permissions[idx] == decl.item => {}
                Some(&idx) => {
                    return Err(ErpkitError::PermissionConflict {
                        name: decl.item.name.clone(),
                        first: set.declared_by[idx].clone(),
                        second: decl.module.clone(),
                    });
                }
                None => {
                    set.index.insert(decl.item.name.clone(), set.permissions.len());
                    set.permissions.push(decl.item.clone());
                    set.declared_by.push(decl.module.clone());
                }
            }
        }
        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<&Permission> {
        self.index.get(name).map(|&idx| &self.permissions[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Module that first declared `name`.
    pub fn declared_by(&self, name: &str) -> Option<&str> {
        self.index.get(name).map(|&idx| self.declared_by[idx].as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}
