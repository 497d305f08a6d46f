//! Publishing parse artifacts.
//!
//! Workers call these paths (through the mutators) once per file key per
//! transaction. Publication is all-or-nothing: sizes are summed up front,
//! the heap reservation either succeeds or the operation returns
//! out-of-space having written nothing, and the file becomes observable at
//! latest only when its parse entity advances.
//!
//! Three paths:
//!
//! - **unchanged-hash fast path** — an existing typed parse with the same
//!   content hash is returned as-is, with no allocation and no list edits;
//! - **update** — the file record is reused and a fresh parse replaces the
//!   latest one;
//! - **fresh** — file record, interned name, and (for non-lib files) the
//!   eponymous file module are created alongside the parse.
//!
//! The returned [`DirtyModules`] set is the work list for the provider
//! selection stage: every module whose provider may need re-picking plus
//! every module whose current provider's content changed.

use crate::store::ParseStore;
use dashmap::mapref::entry::Entry;
use quarry_core::{
    AlocTable, Ast, Docblock, Exports, FileKey, FileKind, HeapError, ModuleName, TolerableFileSig,
    TypeSig,
};
use quarry_heap::{
    AllocSize, Chunk, FileId, FileModuleId, FileModuleRecord, FileRecord, HasteModuleId,
    HasteModuleRecord, ModuleRef, ParseId, ParseRecord, TypedParse,
};
use rustc_hash::FxHashSet;

/// The artifacts a worker produces for a successfully parsed file.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    /// 64-bit content hash.
    pub hash: u64,
    /// Haste name the file declares, if any.
    pub haste_name: Option<String>,
    /// The docblock.
    pub docblock: Docblock,
    /// The syntax tree.
    pub ast: Ast,
    /// The location table.
    pub locs: AlocTable,
    /// The type signature.
    pub type_sig: TypeSig,
    /// The file signature with tolerated errors.
    pub file_sig: TolerableFileSig,
    /// The exports.
    pub exports: Exports,
}

/// The set of modules whose providers may have changed in this operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyModules {
    modules: FxHashSet<ModuleName>,
}

impl DirtyModules {
    /// Add a module.
    pub fn insert(&mut self, module: ModuleName) {
        self.modules.insert(module);
    }

    /// Whether `module` is in the set.
    pub fn contains(&self, module: &ModuleName) -> bool {
        self.modules.contains(module)
    }

    /// Number of dirty modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterate the modules.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleName> {
        self.modules.iter()
    }

    /// Merge another set into this one.
    pub fn extend(&mut self, other: DirtyModules) {
        self.modules.extend(other.modules);
    }
}

impl IntoIterator for DirtyModules {
    type Item = ModuleName;
    type IntoIter = <FxHashSet<ModuleName> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.into_iter()
    }
}

/// Pre-encoded blobs of a typed parse, sized before allocation.
struct EncodedArtifacts {
    ast: Vec<u8>,
    docblock: Vec<u8>,
    exports: Vec<u8>,
    type_sig: Vec<u8>,
    file_sig: Vec<u8>,
    aloc_table: Vec<u8>,
}

impl EncodedArtifacts {
    fn of(input: &ParsedFile) -> Self {
        EncodedArtifacts {
            ast: input.ast.encode().to_vec(),
            docblock: input.docblock.encode().to_vec(),
            exports: input.exports.encode().to_vec(),
            type_sig: input.type_sig.encode().to_vec(),
            file_sig: input.file_sig.encode(),
            aloc_table: input.locs.pack(),
        }
    }

    fn alloc_size(&self) -> AllocSize {
        AllocSize::blob(self.ast.len())
            .and(AllocSize::blob(self.docblock.len()))
            .and(AllocSize::blob(self.exports.len()))
            .and(AllocSize::blob(self.type_sig.len()))
            .and(AllocSize::blob(self.file_sig.len()))
            .and(AllocSize::blob(self.aloc_table.len()))
    }

    fn write(&self, chunk: &mut Chunk<'_>) -> TypedParse {
        TypedParse {
            exports: chunk.write_blob(&self.exports),
            ast: chunk.write_blob(&self.ast),
            docblock: chunk.write_blob(&self.docblock),
            aloc_table: chunk.write_blob(&self.aloc_table),
            file_sig: chunk.write_blob(&self.file_sig),
            type_sig: chunk.write_blob(&self.type_sig),
        }
    }
}

impl ParseStore {
    /// Publish a typed parse for `key`.
    ///
    /// Returns the parse handle (new, or existing on the unchanged-hash
    /// fast path) and the dirty-module set.
    pub(crate) fn add_checked_file(
        &self,
        key: &FileKey,
        txn: u64,
        input: &ParsedFile,
    ) -> Result<(ParseId, DirtyModules), HeapError> {
        let kind = storable_kind(key);

        if let Some(file_id) = self.file_id(key) {
            let file = self.heap.file(file_id);
            if let Some(latest) = file.parse().read_latest() {
                let parse = self.heap.parse(latest);
                if parse.is_typed() && parse.hash() == input.hash {
                    // Content is unchanged: no allocation, no entity
                    // advance, no list edits. The file is still dirty for
                    // rechecking purposes.
                    let dirty = self.content_dirty(key, parse.haste_module());
                    return Ok((latest, dirty));
                }
            }
        }

        let artifacts = EncodedArtifacts::of(input);
        self.publish(key, kind, txn, input.hash, input.haste_name.as_deref(), Some(&artifacts))
    }

    /// Publish an untyped parse for `key` (the file exists but is not
    /// checked: no pragma, parse error, unsupported extension).
    pub(crate) fn add_unparsed_file(
        &self,
        key: &FileKey,
        txn: u64,
        hash: u64,
        haste_name: Option<&str>,
    ) -> Result<(ParseId, DirtyModules), HeapError> {
        let kind = storable_kind(key);
        self.publish(key, kind, txn, hash, haste_name, None)
    }

    /// Clear the latest parse of `key`, if any.
    ///
    /// No physical unlinking happens here; the file's provider nodes become
    /// logically deleted and are collected at the next exclusive traversal.
    pub(crate) fn clear_file(&self, key: &FileKey, txn: u64) -> DirtyModules {
        let Some(file_id) = self.file_id(key) else {
            return DirtyModules::default();
        };
        let file = self.heap.file(file_id);
        let Some(latest) = file.parse().read_latest() else {
            return DirtyModules::default();
        };
        let haste = self.heap.parse(latest).haste_module();
        file.parse().advance(None, txn);

        let mut dirty = DirtyModules::default();
        if let Some(h) = haste {
            dirty.insert(self.haste_module_name(h));
        }
        if key.has_file_module() {
            dirty.insert(ModuleName::File(key.clone()));
        }
        dirty
    }

    /// The update/fresh publication path shared by typed and untyped adds.
    fn publish(
        &self,
        key: &FileKey,
        kind: FileKind,
        txn: u64,
        hash: u64,
        haste_name: Option<&str>,
        artifacts: Option<&EncodedArtifacts>,
    ) -> Result<(ParseId, DirtyModules), HeapError> {
        let existing = self.file_id(key);
        let old_latest = existing.and_then(|f| self.heap.file(f).parse().read_latest());
        let old_haste = old_latest.and_then(|p| self.heap.parse(p).haste_module());

        let mut size = AllocSize::parse_record();
        if let Some(artifacts) = artifacts {
            size = size.and(artifacts.alloc_size());
        }
        size = self.charge_file_infra(size, key, existing.is_some());
        size = self.charge_haste_infra(size, haste_name);

        self.heap.alloc(size, |chunk| {
            let (file_id, file_module) = self.ensure_file(chunk, key, kind, existing);
            let haste = haste_name.map(|name| self.ensure_haste_module(chunk, name));
            let typed = artifacts.map(|a| a.write(chunk));
            let parse = chunk.write_parse(ParseRecord::new(file_id, hash, haste, typed));

            self.heap.file(file_id).parse().advance(Some(parse), txn);

            // A file re-enters its eponymous module's provider list only
            // when the parse went from absent to present.
            let register_file_module = if old_latest.is_none() { file_module } else { None };
            let dirty =
                self.link_and_dirty(key, file_id, parse, old_haste, haste, register_file_module, txn);
            (parse, dirty)
        })
    }

    fn charge_file_infra(&self, size: AllocSize, key: &FileKey, exists: bool) -> AllocSize {
        if exists {
            return size;
        }
        let path = key.path().expect("storable key has a path");
        let mut size = size.and(AllocSize::file_record()).and(AllocSize::string(path.len()));
        if key.has_file_module() && !self.file_modules.contains_key(key) {
            size = size.and(AllocSize::file_module_record());
        }
        size
    }

    fn charge_haste_infra(&self, size: AllocSize, haste_name: Option<&str>) -> AllocSize {
        match haste_name {
            Some(name) if !self.haste_modules.contains_key(name) => size
                .and(AllocSize::haste_module_record())
                .and(AllocSize::string(name.len())),
            _ => size,
        }
    }

    /// Return the file record for `key`, creating it (and its eponymous
    /// module) on the fresh path.
    fn ensure_file(
        &self,
        chunk: &mut Chunk<'_>,
        key: &FileKey,
        kind: FileKind,
        existing: Option<FileId>,
    ) -> (FileId, Option<FileModuleId>) {
        if let Some(file_id) = existing {
            let file = self.heap.file(file_id);
            let file_module = file.file_module();
            if let Some(module) = file_module {
                // A prior commit may have dropped the module from the table
                // when its provider list emptied; re-publish the handle.
                self.file_modules.entry(key.clone()).or_insert(module);
            }
            return (file_id, file_module);
        }

        let path = key.path().expect("storable key has a path");
        let name = chunk.intern(path);
        let file_module = if key.has_file_module() {
            let module = match self.file_modules.entry(key.clone()) {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(entry) => {
                    let module = chunk.write_file_module(FileModuleRecord::new());
                    entry.insert(module);
                    module
                }
            };
            Some(module)
        } else {
            None
        };
        let file_id = chunk.write_file(FileRecord::new(kind, name, file_module));
        self.files.insert(key.clone(), file_id);
        (file_id, file_module)
    }

    /// Look up or create the haste module for `name`.
    fn ensure_haste_module(&self, chunk: &mut Chunk<'_>, name: &str) -> HasteModuleId {
        if let Some(module) = self.haste_modules.get(name) {
            return *module;
        }
        match self.haste_modules.entry(name.to_string()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let interned = chunk.intern(name);
                let module = chunk.write_haste_module(HasteModuleRecord::new(interned));
                entry.insert(module);
                module
            }
        }
    }

    /// Wire the new parse into provider lists and compute the dirty set.
    fn link_and_dirty(
        &self,
        key: &FileKey,
        file: FileId,
        parse: ParseId,
        old_haste: Option<HasteModuleId>,
        new_haste: Option<HasteModuleId>,
        register_file_module: Option<FileModuleId>,
        txn: u64,
    ) -> DirtyModules {
        let mut dirty = DirtyModules::default();
        match (old_haste, new_haste) {
            (None, None) => {}
            (None, Some(new)) => {
                self.register_provider(ModuleRef::Haste(new), parse, file, txn);
                dirty.insert(self.haste_module_name(new));
            }
            (Some(old), None) => {
                // The file no longer provides; unlinking is deferred.
                dirty.insert(self.haste_module_name(old));
            }
            (Some(old), Some(new)) if old == new => {
                // Same module: the provider need not be re-picked, but the
                // content changed, so dependents must be re-checked.
                dirty.insert(self.haste_module_name(new));
            }
            (Some(old), Some(new)) => {
                self.register_provider(ModuleRef::Haste(new), parse, file, txn);
                dirty.insert(self.haste_module_name(old));
                dirty.insert(self.haste_module_name(new));
            }
        }
        if let Some(module) = register_file_module {
            self.register_provider(ModuleRef::File(module), parse, file, txn);
        }
        if key.has_file_module() {
            dirty.insert(ModuleName::File(key.clone()));
        }
        dirty
    }

    fn register_provider(&self, module: ModuleRef, parse: ParseId, file: FileId, txn: u64) {
        let lock = self.heap.lock_module(module);
        lock.add_provider(parse);
        lock.elect_provider_if_unset(file, txn);
    }

    /// The dirty set of an operation that changed content but no provider
    /// registrations.
    fn content_dirty(&self, key: &FileKey, haste: Option<HasteModuleId>) -> DirtyModules {
        let mut dirty = DirtyModules::default();
        if let Some(h) = haste {
            dirty.insert(self.haste_module_name(h));
        }
        if key.has_file_module() {
            dirty.insert(ModuleName::File(key.clone()));
        }
        dirty
    }

    pub(crate) fn haste_module_name(&self, module: HasteModuleId) -> ModuleName {
        let record = self.heap.haste_module(module);
        ModuleName::Haste(self.heap.resolve_string(record.name()).to_string())
    }
}

fn storable_kind(key: &FileKey) -> FileKind {
    match key.kind() {
        Some(kind) => kind,
        None => panic!("builtins cannot be stored"),
    }
}
