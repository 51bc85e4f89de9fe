//! Navigation items contributed by modules.

use crate::core::error::{ErpkitError, Result};
use crate::core::locale::LocaleBundle;
use crate::core::permission::PermissionSet;
use serde::Serialize;
use std::collections::HashSet;

/// A sidebar entry. `name` is a message ID until the item is translated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationItem {
    pub name: String,
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Permission names required to see the item; empty means public.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavigationItem>,
}

impl NavigationItem {
    pub fn new(name: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            href: href.into(),
            icon: None,
            permissions: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn requires(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn child(mut self, child: NavigationItem) -> Self {
        self.children.push(child);
        self
    }

    /// Returns a copy with `name` (recursively) replaced by its localized text.
    pub fn translate(&self, bundle: &LocaleBundle, locale: &str) -> Result<NavigationItem> {
        Ok(NavigationItem {
            name: bundle.localize(locale, &self.name)?.to_string(),
            href: self.href.clone(),
            icon: self.icon.clone(),
            permissions: self.permissions.clone(),
            children: self
                .children
                .iter()
                .map(|c| c.translate(bundle, locale))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    /// Copy restricted to what a holder of `granted` may see. Children are
    /// filtered recursively; `None` when the item itself is hidden.
    pub fn visible_to(&self, granted: &HashSet<&str>) -> Option<NavigationItem> {
        if !self.permissions.iter().all(|p| granted.contains(p.as_str())) {
            return None;
        }
        Some(NavigationItem {
            children: self
                .children
                .iter()
                .filter_map(|c| c.visible_to(granted))
                .collect(),
            ..self.clone()
        })
    }

    fn check_permissions(&self, permissions: &PermissionSet, module: &str) -> Result<()> {
        for p in &self.permissions {
            if !permissions.contains(p) {
                return Err(ErpkitError::ValidationError(format!(
                    "navigation item '{}' from module '{}' requires undeclared permission '{}'",
                    self.name, module, p
                )));
            }
        }
        self.children
            .iter()
            .try_for_each(|c| c.check_permissions(permissions, module))
    }
}

/// Verifies every permission referenced by navigation is declared.
pub fn validate(items: &[crate::core::module::Contribution<NavigationItem>], permissions: &PermissionSet) -> Result<()> {
    items
        .iter()
        .try_for_each(|c| c.item.check_permissions(permissions, &c.module))
}
