//! The store value.
//!
//! [`ParseStore`] bundles the shared heap with the three global key→record
//! tables and the transaction counter. The tables are address-keyed and
//! monotonic where the protocol demands it: once a file key is assigned a
//! file record, that handle never changes.

use crate::cache::LocalCaches;
use crate::error::{StoreError, StoreResult};
use dashmap::DashMap;
use quarry_core::{FileKey, FileKind};
use quarry_heap::{FileId, FileModuleId, HasteModuleId, Heap};
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Construction parameters for a [`ParseStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Shared heap capacity in bytes.
    pub heap_capacity: u64,
    /// Capacity of each per-process read cache, in entries.
    pub cache_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig { heap_capacity: quarry_heap::arena::DEFAULT_CAPACITY, cache_capacity: 1024 }
    }
}

/// A point-in-time sample of store counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMetrics {
    /// File records allocated.
    pub files: usize,
    /// Parse records allocated.
    pub parses: usize,
    /// File-module records allocated.
    pub file_modules: usize,
    /// Haste-module records allocated.
    pub haste_modules: usize,
    /// Heap bytes in use.
    pub heap_used_bytes: u64,
    /// Heap byte capacity.
    pub heap_capacity_bytes: u64,
    /// Transactions committed.
    pub transactions_committed: u64,
    /// Transactions rolled back.
    pub transactions_rolled_back: u64,
}

/// The concurrent, transactional store of parse artifacts and module
/// providers.
///
/// One value per process group; workers and the master share it behind an
/// `Arc`. All mutation goes through the mutators, all reading through the
/// reader flavors.
pub struct ParseStore {
    pub(crate) heap: Heap,

    /// File key → file record. Monotonic: entries are inserted once and only
    /// removed when a reparse commits a not-found set.
    pub(crate) files: DashMap<FileKey, FileId, FxBuildHasher>,
    /// File key → eponymous module record.
    pub(crate) file_modules: DashMap<FileKey, FileModuleId, FxBuildHasher>,
    /// Haste name → module record.
    pub(crate) haste_modules: DashMap<String, HasteModuleId, FxBuildHasher>,

    /// Id of the most recently committed transaction.
    committed_txn: AtomicU64,
    /// Id of the open transaction, `0` when none.
    active_txn: AtomicU64,

    pub(crate) caches: LocalCaches,

    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
}

impl ParseStore {
    /// Create a store with default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create a store from explicit configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        ParseStore {
            heap: Heap::with_capacity(config.heap_capacity),
            files: DashMap::with_hasher(FxBuildHasher),
            file_modules: DashMap::with_hasher(FxBuildHasher),
            haste_modules: DashMap::with_hasher(FxBuildHasher),
            committed_txn: AtomicU64::new(0),
            active_txn: AtomicU64::new(0),
            caches: LocalCaches::new(config.cache_capacity),
            transactions_committed: AtomicU64::new(0),
            transactions_rolled_back: AtomicU64::new(0),
        }
    }

    /// The underlying heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Id of the most recently committed transaction.
    pub fn committed_txn(&self) -> u64 {
        self.committed_txn.load(Ordering::Acquire)
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.active_txn.load(Ordering::Acquire) != 0
    }

    /// Claim the next transaction id, failing if one is already open.
    ///
    /// At most one transaction may be open per store; the master owns
    /// [`crate::Transaction::begin`] and hands the transaction to the
    /// mutators it creates.
    pub(crate) fn try_begin(&self) -> StoreResult<u64> {
        let id = self.committed_txn() + 1;
        match self.active_txn.compare_exchange(0, id, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => {
                tracing::debug!(txn = id, "transaction opened");
                Ok(id)
            }
            Err(active) => Err(StoreError::TransactionActive { active }),
        }
    }

    /// Finish a commit: publish the counter, then fire hooks.
    ///
    /// The counter moves first so that hook work (cache invalidation, table
    /// deletions) happens entirely in the post-commit world; a reader racing
    /// a hook can at worst re-read a value that was just published.
    pub(crate) fn finish_commit(&self, id: u64, hooks: Vec<crate::transaction::Hook>) {
        self.committed_txn.store(id, Ordering::Release);
        for hook in hooks {
            hook.fire_commit();
        }
        self.active_txn.store(0, Ordering::Release);
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(txn = id, "transaction committed");
    }

    /// Finish a rollback: fire hooks with the counter untouched.
    pub(crate) fn finish_rollback(&self, id: u64, hooks: Vec<crate::transaction::Hook>) {
        for hook in hooks {
            hook.fire_rollback();
        }
        self.active_txn.store(0, Ordering::Release);
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(txn = id, "transaction rolled back");
    }

    /// Look up the file record for a key.
    pub(crate) fn file_id(&self, key: &FileKey) -> Option<FileId> {
        self.files.get(key).map(|entry| *entry)
    }

    /// Reconstruct the key a file record was stored under.
    pub(crate) fn file_key(&self, file: FileId) -> FileKey {
        let record = self.heap.file(file);
        let path = self.heap.resolve_string(record.name()).to_string();
        match record.kind() {
            FileKind::Source => FileKey::Source(path),
            FileKind::Json => FileKey::Json(path),
            FileKind::Resource => FileKey::Resource(path),
            FileKind::Lib => FileKey::Lib(path),
        }
    }

    /// The live providers of `module`, in registration order.
    ///
    /// Takes the module's exclusive lock and physically unlinks any
    /// logically deleted nodes found on the way. Master-side only: this is
    /// the surface the provider-selection stage iterates.
    pub fn all_providers_exclusive(
        &self,
        module: &quarry_core::ModuleName,
    ) -> quarry_core::LookupResult<Vec<FileKey>> {
        let module_ref = self.module_ref(module)?;
        let lock = self.heap.lock_module(module_ref);
        Ok(lock.providers().into_iter().map(|file| self.file_key(file)).collect())
    }

    /// Sample the store counters.
    pub fn metrics(&self) -> StoreMetrics {
        StoreMetrics {
            files: self.heap.file_count(),
            parses: self.heap.parse_count(),
            file_modules: self.heap.file_module_count(),
            haste_modules: self.heap.haste_module_count(),
            heap_used_bytes: self.heap.used(),
            heap_capacity_bytes: self.heap.capacity(),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
        }
    }
}

impl Default for ParseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseStore")
            .field("files", &self.files.len())
            .field("file_modules", &self.file_modules.len())
            .field("haste_modules", &self.haste_modules.len())
            .field("committed_txn", &self.committed_txn())
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
