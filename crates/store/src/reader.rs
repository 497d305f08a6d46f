//! Readers.
//!
//! Three flavors over one implementation:
//!
//! - the **mutator reader** sees the latest slot of every entity and is
//!   meant for use inside a transaction;
//! - the **committed reader** sees the committed slots — the state as of
//!   the last commit — and is what every consumer outside a transaction
//!   uses, including "old value" lookups during a reparse;
//! - the **dispatcher** picks between the two per call, depending on
//!   whether a transaction is open on the store.
//!
//! Which snapshot to read is resolved once at each operation's entry point
//! into a two-case [`View`]; everything downstream is a single code path.
//!
//! Every `get_*` returns an `Option`; the `*_unsafe` twin turns absence
//! into the operation's typed [`LookupError`]. AST and location-table reads
//! go through the per-process caches.

use crate::store::ParseStore;
use quarry_core::{
    Aloc, AlocTable, Ast, Docblock, Exports, FileKey, FileSig, Loc, LookupError, LookupResult,
    ModuleName, TolerableFileSig, TypeSig,
};
use quarry_heap::{ParseId, TypedParse};
use std::sync::Arc;

/// Which entity slot a read observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Latest,
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Mutator,
    Committed,
    Dispatcher,
}

/// A reader over a [`ParseStore`].
#[derive(Clone)]
pub struct StoreReader {
    store: Arc<ParseStore>,
    flavor: Flavor,
}

impl StoreReader {
    /// A reader over the latest view, for use inside a transaction.
    pub fn mutator(store: &Arc<ParseStore>) -> StoreReader {
        StoreReader { store: Arc::clone(store), flavor: Flavor::Mutator }
    }

    /// A reader over the committed view.
    pub fn committed(store: &Arc<ParseStore>) -> StoreReader {
        StoreReader { store: Arc::clone(store), flavor: Flavor::Committed }
    }

    /// A reader that follows the store: latest while a transaction is open,
    /// committed otherwise.
    pub fn dispatcher(store: &Arc<ParseStore>) -> StoreReader {
        StoreReader { store: Arc::clone(store), flavor: Flavor::Dispatcher }
    }
}

impl StoreReader {
    fn view(&self) -> View {
        match self.flavor {
            Flavor::Mutator => View::Latest,
            Flavor::Committed => View::Committed,
            Flavor::Dispatcher => {
                if self.store.in_transaction() {
                    View::Latest
                } else {
                    View::Committed
                }
            }
        }
    }

    fn parse_in_view(&self, key: &FileKey, view: View) -> Option<ParseId> {
        let file_id = self.store.file_id(key)?;
        let file = self.store.heap.file(file_id);
        match view {
            View::Latest => file.parse().read_latest(),
            View::Committed => file.parse().read_committed(self.store.committed_txn()),
        }
    }

    fn typed_in_view(&self, key: &FileKey, view: View) -> Option<(ParseId, TypedParse)> {
        let parse = self.parse_in_view(key, view)?;
        let record = self.store.heap.parse(parse);
        record.typed().map(|typed| (parse, *typed))
    }

    // =========================================================================
    // Parse-level reads
    // =========================================================================

    /// The parse in this reader's view, typed or not.
    pub fn get_parse(&self, key: &FileKey) -> Option<ParseId> {
        self.parse_in_view(key, self.view())
    }

    /// Like [`get_parse`](Self::get_parse), failing with a typed error.
    pub fn get_parse_unsafe(&self, key: &FileKey) -> LookupResult<ParseId> {
        let view = self.view();
        if self.store.file_id(key).is_none() {
            return Err(LookupError::FileNotFound(key.clone()));
        }
        self.parse_in_view(key, view).ok_or_else(|| LookupError::FileNotParsed(key.clone()))
    }

    /// The typed parse, if the file is parsed and checked.
    pub fn get_typed_parse(&self, key: &FileKey) -> Option<ParseId> {
        let view = self.view();
        self.typed_in_view(key, view).map(|(parse, _)| parse)
    }

    /// Like [`get_typed_parse`](Self::get_typed_parse), failing with a
    /// typed error.
    pub fn get_typed_parse_unsafe(&self, key: &FileKey) -> LookupResult<ParseId> {
        let parse = self.get_parse_unsafe(key)?;
        if self.store.heap.parse(parse).is_typed() {
            Ok(parse)
        } else {
            Err(LookupError::FileNotTyped(key.clone()))
        }
    }

    /// Whether the file has a typed parse in this view.
    pub fn is_typed_file(&self, key: &FileKey) -> bool {
        self.get_typed_parse(key).is_some()
    }

    /// Whether an AST is available for the file in this view.
    pub fn has_ast(&self, key: &FileKey) -> bool {
        let view = self.view();
        self.typed_in_view(key, view).is_some()
    }

    /// The file's content hash.
    pub fn get_file_hash(&self, key: &FileKey) -> Option<u64> {
        let parse = self.get_parse(key)?;
        Some(self.store.heap.parse(parse).hash())
    }

    /// Like [`get_file_hash`](Self::get_file_hash), failing with a typed
    /// error.
    pub fn get_file_hash_unsafe(&self, key: &FileKey) -> LookupResult<u64> {
        let parse = self.get_parse_unsafe(key)?;
        Ok(self.store.heap.parse(parse).hash())
    }

    // =========================================================================
    // Artifact reads
    // =========================================================================

    /// The file's AST.
    ///
    /// Committed-view reads go through the per-process AST cache.
    pub fn get_ast(&self, key: &FileKey) -> Option<Ast> {
        let view = self.view();
        if view == View::Committed {
            if let Some(ast) = self.store.caches.committed_ast.lock().get(key) {
                return Some(ast);
            }
        }
        let (_, typed) = self.typed_in_view(key, view)?;
        let ast = Ast::decode(&self.store.heap.blob(typed.ast));
        if view == View::Committed {
            self.store.caches.committed_ast.lock().insert(key.clone(), ast.clone());
        }
        Some(ast)
    }

    /// Like [`get_ast`](Self::get_ast), failing with a typed error.
    pub fn get_ast_unsafe(&self, key: &FileKey) -> LookupResult<Ast> {
        self.get_ast(key).ok_or_else(|| LookupError::AstNotFound(key.clone()))
    }

    /// The file's docblock.
    pub fn get_docblock(&self, key: &FileKey) -> Option<Docblock> {
        let view = self.view();
        let (_, typed) = self.typed_in_view(key, view)?;
        Some(Docblock::decode(&self.store.heap.blob(typed.docblock)))
    }

    /// Like [`get_docblock`](Self::get_docblock), failing with a typed
    /// error.
    pub fn get_docblock_unsafe(&self, key: &FileKey) -> LookupResult<Docblock> {
        self.get_docblock(key).ok_or_else(|| LookupError::DocblockNotFound(key.clone()))
    }

    /// The file's exports.
    pub fn get_exports(&self, key: &FileKey) -> Option<Exports> {
        let view = self.view();
        let (_, typed) = self.typed_in_view(key, view)?;
        Some(Exports::decode(&self.store.heap.blob(typed.exports)))
    }

    /// Like [`get_exports`](Self::get_exports), failing with a typed error.
    pub fn get_exports_unsafe(&self, key: &FileKey) -> LookupResult<Exports> {
        self.get_exports(key).ok_or_else(|| LookupError::FileNotTyped(key.clone()))
    }

    /// The file's type signature.
    pub fn get_type_sig(&self, key: &FileKey) -> Option<TypeSig> {
        let view = self.view();
        let (_, typed) = self.typed_in_view(key, view)?;
        Some(TypeSig::decode(&self.store.heap.blob(typed.type_sig)))
    }

    /// Like [`get_type_sig`](Self::get_type_sig), failing with a typed
    /// error.
    pub fn get_type_sig_unsafe(&self, key: &FileKey) -> LookupResult<TypeSig> {
        self.get_type_sig(key).ok_or_else(|| LookupError::TypeSigNotFound(key.clone()))
    }

    /// The file's signature, without the tolerated errors.
    pub fn get_file_sig(&self, key: &FileKey) -> Option<FileSig> {
        self.get_tolerable_file_sig(key).map(|tolerable| tolerable.sig)
    }

    /// Like [`get_file_sig`](Self::get_file_sig), failing with a typed
    /// error.
    pub fn get_file_sig_unsafe(&self, key: &FileKey) -> LookupResult<FileSig> {
        self.get_file_sig(key).ok_or_else(|| LookupError::FileNotTyped(key.clone()))
    }

    /// The file's signature together with its tolerated errors.
    pub fn get_tolerable_file_sig(&self, key: &FileKey) -> Option<TolerableFileSig> {
        let view = self.view();
        let (_, typed) = self.typed_in_view(key, view)?;
        Some(TolerableFileSig::decode(&self.store.heap.blob(typed.file_sig)))
    }

    /// Like [`get_tolerable_file_sig`](Self::get_tolerable_file_sig),
    /// failing with a typed error.
    pub fn get_tolerable_file_sig_unsafe(&self, key: &FileKey) -> LookupResult<TolerableFileSig> {
        self.get_tolerable_file_sig(key).ok_or_else(|| LookupError::FileNotTyped(key.clone()))
    }

    /// The module specifiers the file requires.
    pub fn get_requires(&self, key: &FileKey) -> Option<Vec<String>> {
        self.get_file_sig(key).map(|sig| sig.requires)
    }

    /// Like [`get_requires`](Self::get_requires), failing with a typed
    /// error.
    pub fn get_requires_unsafe(&self, key: &FileKey) -> LookupResult<Vec<String>> {
        self.get_requires(key).ok_or_else(|| LookupError::RequiresNotFound(key.clone()))
    }

    /// The file's unpacked location table.
    ///
    /// Reads go through the view-appropriate cache: the mutator cache for
    /// latest reads, the committed cache otherwise.
    pub fn get_aloc_table(&self, key: &FileKey) -> Option<AlocTable> {
        let view = self.view();
        let cache = match view {
            View::Latest => &self.store.caches.mutator_aloc,
            View::Committed => &self.store.caches.committed_aloc,
        };
        if let Some(table) = cache.lock().get(key) {
            return Some(table);
        }
        let (_, typed) = self.typed_in_view(key, view)?;
        let table = AlocTable::unpack(&self.store.heap.blob(typed.aloc_table));
        cache.lock().insert(key.clone(), table.clone());
        Some(table)
    }

    /// Like [`get_aloc_table`](Self::get_aloc_table), failing with a typed
    /// error.
    pub fn get_aloc_table_unsafe(&self, key: &FileKey) -> LookupResult<AlocTable> {
        self.get_aloc_table(key).ok_or_else(|| LookupError::AlocTableNotFound(key.clone()))
    }

    /// Convert an abstract location in `key` to a concrete one, lazily
    /// looking up the file's location table.
    pub fn loc_of_aloc(&self, key: &FileKey, aloc: Aloc) -> LookupResult<Loc> {
        let table = self.get_aloc_table_unsafe(key)?;
        table.get(aloc).ok_or_else(|| LookupError::AlocTableNotFound(key.clone()))
    }

    // =========================================================================
    // Module reads
    // =========================================================================

    /// The file currently providing `module` in this view, if a provider
    /// has been chosen.
    pub fn get_provider(&self, module: &ModuleName) -> Option<FileKey> {
        self.provider_in_view(module).ok().flatten()
    }

    /// Like [`get_provider`](Self::get_provider), failing with a typed
    /// error when the module itself is unknown.
    pub fn get_provider_unsafe(&self, module: &ModuleName) -> LookupResult<Option<FileKey>> {
        self.provider_in_view(module)
    }

    fn provider_in_view(&self, module: &ModuleName) -> LookupResult<Option<FileKey>> {
        let view = self.view();
        let module_ref = self.store.module_ref(module)?;
        let entity = match module_ref {
            quarry_heap::ModuleRef::File(id) => {
                let record = self.store.heap.file_module(id);
                match view {
                    View::Latest => record.provider().read_latest(),
                    View::Committed => record.provider().read_committed(self.store.committed_txn()),
                }
            }
            quarry_heap::ModuleRef::Haste(id) => {
                let record = self.store.heap.haste_module(id);
                match view {
                    View::Latest => record.provider().read_latest(),
                    View::Committed => record.provider().read_committed(self.store.committed_txn()),
                }
            }
        };
        Ok(entity.map(|file| self.store.file_key(file)))
    }
}

impl std::fmt::Debug for StoreReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreReader").field("flavor", &self.flavor).finish()
    }
}
