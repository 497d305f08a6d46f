//! Per-process read caches.
//!
//! Decoding an AST blob or unpacking a location table on every read would
//! swamp the heap lookup itself, so a small LRU sits in front of each.
//! Caches are process-local and never shared: the heap stays the source of
//! truth and cache invalidation follows the commit protocol.
//!
//! - The committed reader's AST and aloc-table caches are invalidated at
//!   commit, for the changed file set only.
//! - The mutator reader's aloc-table cache is cleared wholesale at every
//!   commit and rollback, since the latest view it caches may be reverted.

use parking_lot::Mutex;
use quarry_core::{AlocTable, Ast, FileKey};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::hash::Hash;

/// A small capacity-bounded LRU.
#[derive(Debug)]
pub(crate) struct Lru<K: Eq + Hash + Clone, V: Clone> {
    capacity: usize,
    map: FxHashMap<K, V>,
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V: Clone> Lru<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Lru { capacity, map: FxHashMap::default(), order: VecDeque::new() }
    }

    pub(crate) fn get(&mut self, key: &K) -> Option<V> {
        let value = self.map.get(key)?.clone();
        self.touch(key);
        Some(value)
    }

    pub(crate) fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        if self.map.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        if self.map.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.map.remove(&evicted);
            }
        }
    }

    pub(crate) fn remove(&mut self, key: &K) {
        if self.map.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    fn touch(&mut self, key: &K) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.clone());
    }
}

/// The caches owned by one store value.
#[derive(Debug)]
pub(crate) struct LocalCaches {
    pub(crate) committed_ast: Mutex<Lru<FileKey, Ast>>,
    pub(crate) committed_aloc: Mutex<Lru<FileKey, AlocTable>>,
    pub(crate) mutator_aloc: Mutex<Lru<FileKey, AlocTable>>,
}

impl LocalCaches {
    pub(crate) fn new(capacity: usize) -> Self {
        LocalCaches {
            committed_ast: Mutex::new(Lru::new(capacity)),
            committed_aloc: Mutex::new(Lru::new(capacity)),
            mutator_aloc: Mutex::new(Lru::new(capacity)),
        }
    }

    /// Commit-time invalidation: drop committed entries for the changed
    /// files, drop the mutator view entirely.
    pub(crate) fn invalidate_for_commit<'a>(&self, changed: impl IntoIterator<Item = &'a FileKey>) {
        let mut ast = self.committed_ast.lock();
        let mut aloc = self.committed_aloc.lock();
        for key in changed {
            ast.remove(key);
            aloc.remove(key);
        }
        drop(ast);
        drop(aloc);
        self.mutator_aloc.lock().clear();
    }

    /// Rollback-time invalidation: committed values are untouched by a
    /// rollback, only the mutator view is stale.
    pub(crate) fn invalidate_for_rollback(&self) {
        self.mutator_aloc.lock().clear();
    }
}
