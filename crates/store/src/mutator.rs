//! Mutators: the worker-facing write surfaces.
//!
//! Three flavors plus a restricted loader:
//!
//! - [`ParseMutator`] — fresh parsing during initialization. No rollback
//!   support and no transaction hooks; if init fails the store is discarded.
//! - [`ReparseMutator`] — incremental reparsing. Tracks which files actually
//!   changed and which disappeared; registers commit and rollback hooks that
//!   finish or undo the batch.
//! - [`CommitModulesMutator`] — the provider-selection stage's surface:
//!   record chosen providers and modules left with no providers; the commit
//!   hook drops empty modules from the tables.
//! - [`SavedStateLoader`] — direct allocation of already-committed records
//!   during startup, before any transaction exists.
//!
//! Mutators are cheap handles over the shared store; workers each hold one.

use crate::publish::{DirtyModules, ParsedFile};
use crate::store::ParseStore;
use crate::transaction::Transaction;
use parking_lot::Mutex;
use quarry_core::{FileKey, HeapError, LookupError, LookupResult, ModuleName};
use quarry_heap::{FileModuleRecord, FileRecord, HasteModuleRecord, ModuleRef, ParseRecord};
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Mutator for fresh parsing.
pub struct ParseMutator {
    store: Arc<ParseStore>,
    txn: u64,
}

impl ParseMutator {
    /// Create a fresh-parse mutator bound to `txn`.
    pub fn new(store: &Arc<ParseStore>, txn: &Transaction) -> Self {
        ParseMutator { store: Arc::clone(store), txn: txn.id() }
    }

    /// Publish a typed parse.
    pub fn add_parsed(&self, key: &FileKey, input: &ParsedFile) -> Result<DirtyModules, HeapError> {
        self.store.add_checked_file(key, self.txn, input).map(|(_, dirty)| dirty)
    }

    /// Publish an untyped parse.
    pub fn add_unparsed(
        &self,
        key: &FileKey,
        hash: u64,
        haste_name: Option<&str>,
    ) -> Result<DirtyModules, HeapError> {
        self.store.add_unparsed_file(key, self.txn, hash, haste_name).map(|(_, dirty)| dirty)
    }

    /// During fresh parsing a missing file simply was never there; there is
    /// nothing to clear.
    pub fn clear_not_found(&self, _key: &FileKey) -> DirtyModules {
        DirtyModules::default()
    }
}

struct ReparseState {
    changed: Mutex<FxHashSet<FileKey>>,
    not_found: Mutex<FxHashSet<FileKey>>,
}

/// Mutator for incremental reparsing, with rollback support.
pub struct ReparseMutator {
    store: Arc<ParseStore>,
    txn: u64,
    state: Arc<ReparseState>,
}

impl ReparseMutator {
    /// Create a reparse mutator bound to `txn` over the files to reparse.
    ///
    /// Registers the commit and rollback hooks that finish the batch.
    pub fn new(
        store: &Arc<ParseStore>,
        txn: &mut Transaction,
        files: impl IntoIterator<Item = FileKey>,
    ) -> Self {
        let store = Arc::clone(store);
        let state = Arc::new(ReparseState {
            changed: Mutex::new(files.into_iter().collect()),
            not_found: Mutex::new(FxHashSet::default()),
        });

        let commit_store = Arc::clone(&store);
        let commit_state = Arc::clone(&state);
        let rollback_store = Arc::clone(&store);
        let rollback_state = Arc::clone(&state);
        let txn_id = txn.id();
        txn.add(
            "reparse",
            move || commit_store.finish_reparse_commit(&commit_state),
            move || rollback_store.finish_reparse_rollback(&rollback_state, txn_id),
        );

        ReparseMutator { store, txn: txn_id, state }
    }

    /// Publish a typed parse.
    pub fn add_parsed(&self, key: &FileKey, input: &ParsedFile) -> Result<DirtyModules, HeapError> {
        self.store.add_checked_file(key, self.txn, input).map(|(_, dirty)| dirty)
    }

    /// Publish an untyped parse.
    pub fn add_unparsed(
        &self,
        key: &FileKey,
        hash: u64,
        haste_name: Option<&str>,
    ) -> Result<DirtyModules, HeapError> {
        self.store.add_unparsed_file(key, self.txn, hash, haste_name).map(|(_, dirty)| dirty)
    }

    /// The worker found the file's hash unchanged: nothing to roll back and
    /// no cache to invalidate for this key.
    pub fn record_unchanged(&self, key: &FileKey) {
        self.state.changed.lock().remove(key);
    }

    /// The file disappeared: clear its parse now and delete the record at
    /// commit.
    pub fn record_not_found(&self, key: &FileKey) -> DirtyModules {
        self.state.not_found.lock().insert(key.clone());
        self.store.clear_file(key, self.txn)
    }

    /// The files still considered changed by this reparse.
    pub fn changed_files(&self) -> FxHashSet<FileKey> {
        self.state.changed.lock().clone()
    }
}

impl ParseStore {
    fn finish_reparse_commit(&self, state: &ReparseState) {
        let changed = state.changed.lock();
        self.caches.invalidate_for_commit(changed.iter());
        drop(changed);

        let not_found = state.not_found.lock();
        for key in not_found.iter() {
            if self.files.remove(key).is_some() {
                tracing::debug!(file = %key, "removed not-found file");
            }
        }
    }

    fn finish_reparse_rollback(&self, state: &ReparseState, txn: u64) {
        let changed = state.changed.lock();
        for key in changed.iter() {
            self.rollback_file(key, txn);
        }
        drop(changed);
        state.not_found.lock().clear();
        self.caches.invalidate_for_rollback();
    }
}

struct CommitModulesState {
    no_providers: Mutex<Vec<ModuleName>>,
    touched: Mutex<Vec<ModuleName>>,
}

/// Mutator for the module-commit stage.
pub struct CommitModulesMutator {
    store: Arc<ParseStore>,
    txn: u64,
    state: Arc<CommitModulesState>,
}

impl CommitModulesMutator {
    /// Create a commit-modules mutator bound to `txn`.
    pub fn new(store: &Arc<ParseStore>, txn: &mut Transaction) -> Self {
        let store = Arc::clone(store);
        let state = Arc::new(CommitModulesState {
            no_providers: Mutex::new(Vec::new()),
            touched: Mutex::new(Vec::new()),
        });

        let commit_store = Arc::clone(&store);
        let commit_state = Arc::clone(&state);
        let rollback_store = Arc::clone(&store);
        let rollback_state = Arc::clone(&state);
        let txn_id = txn.id();
        txn.add(
            "commit_modules",
            move || commit_store.finish_commit_modules(&commit_state),
            move || rollback_store.rollback_commit_modules(&rollback_state, txn_id),
        );

        CommitModulesMutator { store, txn: txn_id, state }
    }

    /// Record the provider the selection stage chose for `module`.
    pub fn set_provider(&self, module: &ModuleName, provider: Option<&FileKey>) -> LookupResult<()> {
        let module_ref = self.store.module_ref(module)?;
        let file = match provider {
            Some(key) => Some(
                self.store.file_id(key).ok_or_else(|| LookupError::FileNotFound(key.clone()))?,
            ),
            None => None,
        };
        let lock = self.store.heap.lock_module(module_ref);
        lock.provider().advance(file, self.txn);
        self.state.touched.lock().push(module.clone());
        Ok(())
    }

    /// Record that `module` ended the transaction with no live providers;
    /// its record will be dropped from the tables at commit.
    pub fn record_no_providers(&self, module: ModuleName) {
        self.state.no_providers.lock().push(module);
    }
}

impl ParseStore {
    pub(crate) fn module_ref(&self, module: &ModuleName) -> LookupResult<ModuleRef> {
        match module {
            ModuleName::Haste(name) => self
                .haste_modules
                .get(name)
                .map(|entry| ModuleRef::Haste(*entry))
                .ok_or_else(|| LookupError::HasteModuleNotFound(name.clone())),
            ModuleName::File(key) => self
                .file_modules
                .get(key)
                .map(|entry| ModuleRef::File(*entry))
                .ok_or_else(|| LookupError::FileModuleNotFound(key.clone())),
        }
    }

    fn finish_commit_modules(&self, state: &CommitModulesState) {
        let no_providers = state.no_providers.lock();
        for module in no_providers.iter() {
            let removed = match module {
                ModuleName::Haste(name) => self.haste_modules.remove(name).is_some(),
                ModuleName::File(key) => self.file_modules.remove(key).is_some(),
            };
            if removed {
                tracing::debug!(module = %module, "removed module with no providers");
            }
        }
    }

    fn rollback_commit_modules(&self, state: &CommitModulesState, txn: u64) {
        // The pending deletion set is discarded without touching the tables;
        // provider choices made this transaction are reverted.
        state.no_providers.lock().clear();
        let touched = state.touched.lock();
        for module in touched.iter() {
            if let Ok(module_ref) = self.module_ref(module) {
                let lock = self.heap.lock_module(module_ref);
                lock.provider().rollback(txn);
            }
        }
    }
}

/// Restricted create path for saved-state loading.
///
/// Allocates typed parse records whose entities are born committed. Used
/// exactly once during startup, before the first transaction; none of these
/// writes can be rolled back.
pub struct SavedStateLoader {
    store: Arc<ParseStore>,
}

impl SavedStateLoader {
    /// Create the loader.
    pub fn new(store: &Arc<ParseStore>) -> Self {
        SavedStateLoader { store: Arc::clone(store) }
    }

    /// Load one file's artifacts as already-committed state.
    pub fn load_file(&self, key: &FileKey, input: &ParsedFile) -> Result<(), HeapError> {
        self.store.load_saved_file(key, input)
    }
}

impl ParseStore {
    fn load_saved_file(&self, key: &FileKey, input: &ParsedFile) -> Result<(), HeapError> {
        use dashmap::mapref::entry::Entry;
        use quarry_heap::{AllocSize, TypedParse};

        let kind = key.kind().expect("builtins cannot be stored");
        debug_assert!(
            self.file_id(key).is_none(),
            "saved-state load of an already-known file"
        );

        let ast = input.ast.encode();
        let docblock = input.docblock.encode();
        let exports = input.exports.encode();
        let type_sig = input.type_sig.encode();
        let file_sig = input.file_sig.encode();
        let aloc_table = input.locs.pack();
        let path = key.path().expect("storable key has a path");

        let mut size = AllocSize::file_record()
            .and(AllocSize::parse_record())
            .and(AllocSize::string(path.len()))
            .and(AllocSize::blob(ast.len()))
            .and(AllocSize::blob(docblock.len()))
            .and(AllocSize::blob(exports.len()))
            .and(AllocSize::blob(type_sig.len()))
            .and(AllocSize::blob(file_sig.len()))
            .and(AllocSize::blob(aloc_table.len()));
        if key.has_file_module() {
            size = size.and(AllocSize::file_module_record());
        }
        if let Some(name) = input.haste_name.as_deref() {
            if !self.haste_modules.contains_key(name) {
                size = size.and(AllocSize::haste_module_record()).and(AllocSize::string(name.len()));
            }
        }

        let committed = self.committed_txn();
        self.heap.alloc(size, |chunk| {
            let name = chunk.intern(path);
            let typed = TypedParse {
                exports: chunk.write_blob(exports),
                ast: chunk.write_blob(ast),
                docblock: chunk.write_blob(docblock),
                aloc_table: chunk.write_blob(&aloc_table),
                file_sig: chunk.write_blob(&file_sig),
                type_sig: chunk.write_blob(type_sig),
            };

            let haste = input.haste_name.as_deref().map(|haste_name| {
                if let Some(module) = self.haste_modules.get(haste_name) {
                    return *module;
                }
                match self.haste_modules.entry(haste_name.to_string()) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        let interned = chunk.intern(haste_name);
                        let module = chunk.write_haste_module(HasteModuleRecord::new(interned));
                        entry.insert(module);
                        module
                    }
                }
            });

            let file_module = if key.has_file_module() {
                let module = chunk.write_file_module(FileModuleRecord::new());
                self.file_modules.insert(key.clone(), module);
                Some(module)
            } else {
                None
            };

            // Allocate the file with its parse already committed, then link
            // providers; election uses the committed counter so the choice
            // reads as committed in both views.
            let file_placeholder = FileRecord::new(kind, name, file_module);
            let file_id = chunk.write_file(file_placeholder);
            let parse =
                chunk.write_parse(ParseRecord::new(file_id, input.hash, haste, Some(typed)));
            let file = self.heap.file(file_id);
            file.parse().advance(Some(parse), committed);
            self.files.insert(key.clone(), file_id);

            if let Some(module) = file_module {
                let lock = self.heap.lock_module(ModuleRef::File(module));
                lock.add_provider(parse);
                lock.elect_provider_if_unset(file_id, committed);
            }
            if let Some(module) = haste {
                let lock = self.heap.lock_module(ModuleRef::Haste(module));
                lock.add_provider(parse);
                lock.elect_provider_if_unset(file_id, committed);
            }
        })
    }
}

