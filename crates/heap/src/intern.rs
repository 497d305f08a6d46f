//! String interning.
//!
//! File paths and haste names repeat across records, so the heap stores each
//! distinct string once. Lookups are lock-free reads on a sharded map;
//! resolution goes through an append-only table guarded by a read-write
//! lock, held only long enough to clone the `Arc`.

use crate::handle::StringId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

/// The heap's string interner.
#[derive(Debug, Default)]
pub struct Interner {
    ids: DashMap<Arc<str>, StringId, FxBuildHasher>,
    strings: RwLock<Vec<Arc<str>>>,
}

impl Interner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning its handle and whether it was newly added.
    pub fn intern(&self, s: &str) -> (StringId, bool) {
        if let Some(id) = self.ids.get(s) {
            return (*id, false);
        }
        match self.ids.entry(Arc::from(s)) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                let mut strings = self.strings.write();
                strings.push(entry.key().clone());
                let id = StringId::new(strings.len() as u32);
                entry.insert(id);
                (id, true)
            }
        }
    }

    /// Resolve a handle to its string.
    pub fn resolve(&self, id: StringId) -> Arc<str> {
        self.strings.read()[id.index() as usize - 1].clone()
    }

    /// Number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.strings.read().len()
    }

    /// Whether nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
