//! # Name registry.
//!
//! Maps qualified names to services and slots, and keeps the preload table of
//! startup handlers that `require` consumes at most once per name.
//!
//! ## Architecture
//! ```text
//! Registry
//!   ├─ entries:  HashMap<String, Entry>        ("echo" → Service, "echo.ping" → Slot)
//!   └─ preload:  HashMap<String, handler>      (taken by the first require)
//! ```
//!
//! ## Rules
//! - Names are unique across services and slots
//! - Removal is identity-checked: a stale handle never evicts a newer entry
//! - Guarded by the global runtime lock

use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;
use std::sync::Arc;

use crate::error::RuntimeError;
use crate::services::{ServiceHandler, ServiceRef};
use crate::slots::SlotRef;

/// One registered name.
#[derive(Clone)]
pub(crate) enum Entry {
    Service(ServiceRef),
    Slot(SlotRef),
}

impl Entry {
    /// Addressable slot behind the name (a service's primary slot).
    pub(crate) fn slot(&self) -> SlotRef {
        match self {
            Entry::Service(svc) => Arc::clone(svc.slot()),
            Entry::Slot(slot) => Arc::clone(slot),
        }
    }
}

pub(crate) struct Registry {
    entries: HashMap<String, Entry>,
    preload: HashMap<String, Arc<dyn ServiceHandler>>,
}

impl Registry {
    /// Creates a registry with the root service bound to its name.
    pub(crate) fn new(root: &ServiceRef) -> Self {
        let mut entries = HashMap::new();
        entries.insert(root.name().to_string(), Entry::Service(Arc::clone(root)));
        Self {
            entries,
            preload: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Registers a service or slot; fails if the name is bound.
    pub(crate) fn insert(&mut self, name: &str, entry: Entry) -> Result<(), RuntimeError> {
        match self.entries.entry(name.to_string()) {
            MapEntry::Occupied(_) => Err(RuntimeError::NameTaken {
                name: name.to_string(),
            }),
            MapEntry::Vacant(v) => {
                v.insert(entry);
                Ok(())
            }
        }
    }

    /// Removes `name` only if it is still bound to this very service.
    pub(crate) fn remove_service(&mut self, svc: &ServiceRef) {
        let hit = matches!(
            self.entries.get(svc.name()),
            Some(Entry::Service(s)) if Arc::ptr_eq(s, svc)
        );
        if hit {
            self.entries.remove(svc.name());
        }
    }

    /// Removes `slot` only if its name is still bound to it.
    pub(crate) fn remove_slot(&mut self, slot: &SlotRef) {
        let hit = matches!(
            self.entries.get(slot.name()),
            Some(Entry::Slot(s)) if Arc::ptr_eq(s, slot)
        );
        if hit {
            self.entries.remove(slot.name());
        }
    }

    /// Stores a preload handler; an existing binding for `name` wins.
    pub(crate) fn preload(&mut self, name: &str, handler: Arc<dyn ServiceHandler>) -> bool {
        if self.entries.contains_key(name) || self.preload.contains_key(name) {
            return false;
        }
        self.preload.insert(name.to_string(), handler);
        true
    }

    /// Consumes the preload handler for `name`.
    pub(crate) fn take_preload(&mut self, name: &str) -> Option<Arc<dyn ServiceHandler>> {
        self.preload.remove(name)
    }

    /// Registered services, in no particular order.
    pub(crate) fn services(&self) -> Vec<ServiceRef> {
        self.entries
            .values()
            .filter_map(|e| match e {
                Entry::Service(svc) => Some(Arc::clone(svc)),
                Entry::Slot(_) => None,
            })
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.preload.clear();
    }
}
