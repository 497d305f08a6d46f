//! Record layouts.
//!
//! Four record kinds make up the store's object graph:
//!
//! - [`FileRecord`] — one per file key, created once and never replaced; its
//!   parse entity advances as the file is reparsed.
//! - [`ParseRecord`] — one per (re)parse of a file; typed parses carry the
//!   checked artifact blobs, untyped parses only the hash and haste binding.
//!   Parse records are also the nodes of the provider lists, so they carry
//!   the intrusive next-pointers and a back-reference to their file.
//! - [`FileModuleRecord`] — the eponymous module of a non-lib file.
//! - [`HasteModuleRecord`] — a module declared by name.
//!
//! All mutable state is atomic (entities and list pointers); everything else
//! is immutable after allocation, which is what lets records be shared
//! freely across worker threads.

use crate::entity::Entity;
use crate::handle::{BlobId, FileId, FileModuleId, HasteModuleId, ParseId, StringId};
use quarry_core::FileKind;
use std::sync::atomic::{AtomicU32, Ordering};

/// A file known to the store.
#[derive(Debug)]
pub struct FileRecord {
    kind: FileKind,
    name: StringId,
    file_module: Option<FileModuleId>,
    parse: Entity<ParseId>,
}

impl FileRecord {
    /// Create a file record with an empty parse entity.
    pub fn new(kind: FileKind, name: StringId, file_module: Option<FileModuleId>) -> Self {
        FileRecord { kind, name, file_module, parse: Entity::new() }
    }

    /// The file's kind.
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// The interned path.
    pub fn name(&self) -> StringId {
        self.name
    }

    /// The eponymous file module, absent for lib files.
    pub fn file_module(&self) -> Option<FileModuleId> {
        self.file_module
    }

    /// The parse entity.
    pub fn parse(&self) -> &Entity<ParseId> {
        &self.parse
    }
}

/// The artifact blobs of a typed parse.
#[derive(Debug, Clone, Copy)]
pub struct TypedParse {
    /// Serialized exports.
    pub exports: BlobId,
    /// Serialized syntax tree.
    pub ast: BlobId,
    /// Serialized docblock.
    pub docblock: BlobId,
    /// Packed location table.
    pub aloc_table: BlobId,
    /// Encoded tolerable file signature.
    pub file_sig: BlobId,
    /// Serialized type signature.
    pub type_sig: BlobId,
}

/// One (re)parse of a file.
#[derive(Debug)]
pub struct ParseRecord {
    file: FileId,
    hash: u64,
    haste_module: Option<HasteModuleId>,
    typed: Option<TypedParse>,
    next_haste_provider: AtomicU32,
    next_file_provider: AtomicU32,
}

impl ParseRecord {
    /// Create a parse record. `typed` is `None` for unparsed files.
    pub fn new(
        file: FileId,
        hash: u64,
        haste_module: Option<HasteModuleId>,
        typed: Option<TypedParse>,
    ) -> Self {
        ParseRecord {
            file,
            hash,
            haste_module,
            typed,
            next_haste_provider: AtomicU32::new(0),
            next_file_provider: AtomicU32::new(0),
        }
    }

    /// The file this parse belongs to.
    pub fn file(&self) -> FileId {
        self.file
    }

    /// The 64-bit content hash.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The haste module this parse binds its file to, if any.
    pub fn haste_module(&self) -> Option<HasteModuleId> {
        self.haste_module
    }

    /// The typed artifacts, `None` for untyped parses.
    pub fn typed(&self) -> Option<&TypedParse> {
        self.typed.as_ref()
    }

    /// Whether this parse carries checked artifacts.
    pub fn is_typed(&self) -> bool {
        self.typed.is_some()
    }

    pub(crate) fn next_haste_provider(&self) -> &AtomicU32 {
        &self.next_haste_provider
    }

    pub(crate) fn next_file_provider(&self) -> &AtomicU32 {
        &self.next_file_provider
    }
}

/// The eponymous module of a non-lib file.
#[derive(Debug)]
pub struct FileModuleRecord {
    provider: Entity<FileId>,
    providers_head: AtomicU32,
}

impl FileModuleRecord {
    /// Create a file module with no provider.
    pub fn new() -> Self {
        FileModuleRecord { provider: Entity::new(), providers_head: AtomicU32::new(0) }
    }

    /// The chosen-provider entity.
    pub fn provider(&self) -> &Entity<FileId> {
        &self.provider
    }

    pub(crate) fn providers_head(&self) -> &AtomicU32 {
        &self.providers_head
    }
}

impl Default for FileModuleRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// A module declared by name.
#[derive(Debug)]
pub struct HasteModuleRecord {
    name: StringId,
    provider: Entity<FileId>,
    providers_head: AtomicU32,
}

impl HasteModuleRecord {
    /// Create a haste module with no provider.
    pub fn new(name: StringId) -> Self {
        HasteModuleRecord { name, provider: Entity::new(), providers_head: AtomicU32::new(0) }
    }

    /// The interned module name.
    pub fn name(&self) -> StringId {
        self.name
    }

    /// The chosen-provider entity.
    pub fn provider(&self) -> &Entity<FileId> {
        &self.provider
    }

    pub(crate) fn providers_head(&self) -> &AtomicU32 {
        &self.providers_head
    }
}

pub(crate) fn load_link(link: &AtomicU32) -> u32 {
    link.load(Ordering::Acquire)
}

pub(crate) fn store_link(link: &AtomicU32, raw: u32) {
    link.store(raw, Ordering::Release);
}
