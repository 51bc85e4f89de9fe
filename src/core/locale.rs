//! Locale bundle: per-module message catalogs merged into one lookup table.
//!
//! Locale files are JSON objects mapping message IDs to text. A value may be
//! a plain string or an object with an `other` form:
//!
//! ```json
//! { "NavigationLinks.Clients": "Clients", "Clients.Count": { "one": "client", "other": "clients" } }
//! ```
//!
//! The locale is the file name up to the first dot (`en.json`, `ru.crm.json`).
//! Later modules override earlier ones for the same `(locale, id)`.

use crate::core::error::{ErpkitError, Result};
use crate::core::module::Contribution;
use crate::core::source::AssetSource;
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

pub type LocaleSource = Contribution<Arc<dyn AssetSource>>;

/// A message that a later module replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedMessage {
    pub locale: String,
    pub id: String,
    pub overridden: String,
    pub by: String,
}

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    module: String,
}

#[derive(Debug, Clone)]
pub struct LocaleBundle {
    default_locale: String,
    messages: FxHashMap<(String, String), Entry>,
    locales: BTreeSet<String>,
    shadowed: Vec<ShadowedMessage>,
}

fn locale_of(path: &str) -> Option<String> {
    let file = path.rsplit('/').next()?;
    let stem = file.strip_suffix(".json")?;
    let locale = stem.split('.').next()?;
    if locale.is_empty() {
        None
    } else {
        Some(locale.to_string())
    }
}

fn message_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(forms) => forms.get("other").and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}

impl LocaleBundle {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            messages: FxHashMap::default(),
            locales: BTreeSet::new(),
            shadowed: Vec::new(),
        }
    }

    /// Builds the bundle from every module's locale containers, in
    /// registration order.
    pub fn build(default_locale: &str, sources: &[LocaleSource]) -> Result<Self> {
        let mut bundle = Self::new(default_locale);
        for source in sources {
            let label = source.item.label();
            for file in source.item.files()? {
                let Some(locale) = locale_of(&file.path) else {
                    continue;
                };
                let diag = format!("{} ({}/{})", source.module, label, file.path);
                bundle.add_file(&source.module, &locale, &diag, &file.contents)?;
            }
        }
        debug!(
            locales = bundle.locales.len(),
            messages = bundle.messages.len(),
            shadowed = bundle.shadowed.len(),
            "built locale bundle"
        );
        Ok(bundle)
    }

    fn add_file(&mut self, module: &str, locale: &str, diag: &str, contents: &str) -> Result<()> {
        let parsed: JsonValue = serde_json::from_str(contents).map_err(|e| ErpkitError::LocaleError {
            file: diag.to_string(),
            reason: e.to_string(),
        })?;
        let JsonValue::Object(map) = parsed else {
            return Err(ErpkitError::LocaleError {
                file: diag.to_string(),
                reason: "top-level value must be an object".to_string(),
            });
        };

        for (id, value) in map {
            let text = message_text(&value).ok_or_else(|| ErpkitError::LocaleError {
                file: diag.to_string(),
                reason: format!("message '{}' must be a string or an object with an 'other' form", id),
            })?;
            self.insert(module, locale, &id, text);
        }
        self.locales.insert(locale.to_string());
        Ok(())
    }

    /// Inserts one message; an existing `(locale, id)` is overridden.
    pub fn insert(&mut self, module: &str, locale: &str, id: &str, text: String) {
        let key = (locale.to_string(), id.to_string());
        let entry = Entry {
            text,
            module: module.to_string(),
        };
        if let Some(previous) = self.messages.insert(key, entry) {
            debug!(locale, id, overridden = %previous.module, by = module, "locale message overridden");
            self.shadowed.push(ShadowedMessage {
                locale: locale.to_string(),
                id: id.to_string(),
                overridden: previous.module,
                by: module.to_string(),
            });
        }
        self.locales.insert(locale.to_string());
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Exact lookup without fallback.
    pub fn get(&self, locale: &str, id: &str) -> Option<&str> {
        self.messages
            .get(&(locale.to_string(), id.to_string()))
            .map(|e| e.text.as_str())
    }

    /// Looks up `id` in `locale`, then in the default locale.
    pub fn localize(&self, locale: &str, id: &str) -> Result<&str> {
        self.get(locale, id)
            .or_else(|| self.get(&self.default_locale, id))
            .ok_or_else(|| ErpkitError::MissingMessage {
                locale: locale.to_string(),
                id: id.to_string(),
            })
    }

    /// Module that provided the effective text for `(locale, id)`.
    pub fn provider(&self, locale: &str, id: &str) -> Option<&str> {
        self.messages
            .get(&(locale.to_string(), id.to_string()))
            .map(|e| e.module.as_str())
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.locales.iter().map(String::as_str)
    }

    pub fn shadowed(&self) -> &[ShadowedMessage] {
        &self.shadowed
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
