//! Typed service locator.
//!
//! Services are keyed by a [`ServiceKey`], a compile-time token that pairs a
//! stable name with the (usually trait-object) type stored under it. Modules
//! publish their keys as constants so other modules can resolve services
//! without linking against concrete types:
//!
//! ```
//! use erpkit::core::services::{ServiceKey, ServiceLocator};
//! use std::sync::Arc;
//!
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//! pub const GREETER: ServiceKey<dyn Greeter> = ServiceKey::new("demo.greeter");
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String { "hello".into() }
//! }
//!
//! let mut services = ServiceLocator::new();
//! services.register(GREETER, Arc::new(English));
//! assert_eq!(services.resolve(GREETER).unwrap().greet(), "hello");
//! ```
//!
//! Registration needs `&mut self` and therefore happens during single-threaded
//! bootstrap. Resolution needs only `&self`; a populated locator can be shared
//! across request threads behind an `Arc`.

use crate::core::error::{ErpkitError, Result};
use rustc_hash::FxHashMap;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Identity of a service: a unique name bound to the stored type `T`.
pub struct ServiceKey<T: ?Sized + 'static> {
    name: &'static str,
    _type: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + 'static> ServiceKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: ?Sized + 'static> Clone for ServiceKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized + 'static> Copy for ServiceKey<T> {}

impl<T: ?Sized + 'static> fmt::Debug for ServiceKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceKey").field(&self.name).finish()
    }
}

struct ServiceEntry {
    /// Always an `Arc<T>` for the key's `T`.
    instance: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

#[derive(Default)]
pub struct ServiceLocator {
    entries: FxHashMap<&'static str, ServiceEntry>,
}

impl ServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `instance` under `key`. A later registration for the same
    /// key replaces the earlier one.
    pub fn register<T>(&mut self, key: ServiceKey<T>, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let entry = ServiceEntry {
            instance: Box::new(instance),
            type_name: std::any::type_name::<T>(),
        };
        if self.entries.insert(key.name, entry).is_some() {
            warn!(service = key.name, "service re-registered; last registration wins");
        } else {
            debug!(service = key.name, "service registered");
        }
    }

    /// Returns the instance registered for `key`.
    ///
    /// A missing service is a wiring bug: the error is `UnresolvedService`
    /// and callers are expected to propagate it, never to substitute a
    /// default.
    pub fn resolve<T>(&self, key: ServiceKey<T>) -> Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let entry = self
            .entries
            .get(key.name)
            .ok_or_else(|| ErpkitError::UnresolvedService(key.name.to_string()))?;
        entry
            .instance
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| {
                ErpkitError::ServiceTypeMismatch(format!(
                    "{} (registered as {}, requested {})",
                    key.name,
                    entry.type_name,
                    std::any::type_name::<T>()
                ))
            })
    }

    /// Moves every entry of `other` into `self`, with the same last-wins
    /// rule as `register`.
    pub fn absorb(&mut self, other: ServiceLocator) {
        for (name, entry) in other.entries {
            if self.entries.insert(name, entry).is_some() {
                warn!(service = name, "service re-registered; last registration wins");
            }
        }
    }

    pub fn contains<T: ?Sized + 'static>(&self, key: ServiceKey<T>) -> bool {
        self.entries.contains_key(key.name)
    }

    /// Registered service names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLocator")
            .field("services", &self.names())
            .finish()
    }
}
