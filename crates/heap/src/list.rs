//! Intrusive provider lists.
//!
//! Each module record anchors a singly linked list of parse records: the
//! files currently (or recently) declaring that module. The next-pointers
//! live on the parse records, one chain for haste membership and one for
//! file-module membership, so a file can sit in one haste list and its own
//! file-module list at the same time.
//!
//! Deletion is deferred: clearing or re-binding a file never touches the
//! lists it is leaving. Instead, [`ModuleLock::providers`] filters dead
//! nodes while traversing and physically unlinks them as it goes, keeping
//! list length bounded by live providers plus in-flight changes.
//!
//! A node is live when its file's *latest* parse still binds the file to
//! this module: for a haste module, the latest parse names it; for a file
//! module, the latest parse merely exists. Traversing before an entity
//! rollback therefore materializes exactly the deletions the open
//! transaction implied, which is what the rollback sequence relies on.
//!
//! All list operations require the module's exclusive lock; the lock is the
//! only way to obtain a [`ModuleLock`], so the requirement is structural.

use crate::arena::Heap;
use crate::entity::Entity;
use crate::handle::{FileId, FileModuleId, HasteModuleId, ParseId, RawHandle};
use crate::record::{load_link, store_link, FileModuleRecord, HasteModuleRecord, ParseRecord};
use parking_lot::MutexGuard;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

/// Names a module record of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleRef {
    /// An eponymous file module.
    File(FileModuleId),
    /// A haste module.
    Haste(HasteModuleId),
}

impl ModuleRef {
    fn stripe(self, stripes: usize) -> usize {
        let (kind, index) = match self {
            ModuleRef::File(id) => (0usize, id.index()),
            ModuleRef::Haste(id) => (1usize, id.index()),
        };
        (index as usize * 2 + kind) % stripes
    }
}

enum ModuleRecord {
    File(Arc<FileModuleRecord>),
    Haste(Arc<HasteModuleRecord>),
}

impl Heap {
    /// Acquire the exclusive lock for `module`.
    ///
    /// Locks are striped, so two distinct modules may share a stripe; the
    /// store's protocols never hold two module locks at once, which keeps
    /// stripe collisions harmless.
    pub fn lock_module(&self, module: ModuleRef) -> ModuleLock<'_> {
        let guard = self.module_locks[module.stripe(self.module_locks.len())].lock();
        let record = match module {
            ModuleRef::File(id) => ModuleRecord::File(self.file_module(id)),
            ModuleRef::Haste(id) => ModuleRecord::Haste(self.haste_module(id)),
        };
        ModuleLock { heap: self, module, record, _guard: guard }
    }
}

/// An exclusive section over one module's provider list.
pub struct ModuleLock<'a> {
    heap: &'a Heap,
    module: ModuleRef,
    record: ModuleRecord,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> ModuleLock<'a> {
    /// The module this lock covers.
    pub fn module(&self) -> ModuleRef {
        self.module
    }

    /// The module's chosen-provider entity.
    pub fn provider(&self) -> &Entity<FileId> {
        match &self.record {
            ModuleRecord::File(m) => m.provider(),
            ModuleRecord::Haste(m) => m.provider(),
        }
    }

    fn head(&self) -> &AtomicU32 {
        match &self.record {
            ModuleRecord::File(m) => m.providers_head(),
            ModuleRecord::Haste(m) => m.providers_head(),
        }
    }

    fn next_link<'p>(&self, parse: &'p ParseRecord) -> &'p AtomicU32 {
        match self.module {
            ModuleRef::File(_) => parse.next_file_provider(),
            ModuleRef::Haste(_) => parse.next_haste_provider(),
        }
    }

    /// Whether `file` is still bound to this module in the latest view.
    fn is_live(&self, file: FileId) -> bool {
        let latest = self.heap.file(file).parse().read_latest();
        match (self.module, latest) {
            (_, None) => false,
            (ModuleRef::File(_), Some(_)) => true,
            (ModuleRef::Haste(m), Some(p)) => self.heap.parse(p).haste_module() == Some(m),
        }
    }

    /// Link `parse` as a provider node, unless its file is already present.
    ///
    /// Nodes are appended, so traversal yields providers in registration
    /// order. Returns whether a link was made.
    pub fn add_provider(&self, parse: ParseId) -> bool {
        let node = self.heap.parse(parse);
        let file = node.file();

        let mut tail: Option<ParseId> = None;
        let mut cursor = ParseId::from_raw(load_link(self.head()));
        while let Some(p) = cursor {
            let existing = self.heap.parse(p);
            if existing.file() == file {
                return false;
            }
            tail = Some(p);
            cursor = ParseId::from_raw(load_link(self.next_link(&existing)));
        }

        // A re-added node may carry a stale link from before it was unlinked.
        store_link(self.next_link(&node), 0);
        match tail {
            None => store_link(self.head(), parse.index()),
            Some(t) => store_link(self.next_link(&self.heap.parse(t)), parse.index()),
        }
        true
    }

    /// Physically unlink every node belonging to `file`.
    pub fn remove_provider(&self, file: FileId) {
        let mut prev: Option<ParseId> = None;
        let mut cursor = ParseId::from_raw(load_link(self.head()));
        while let Some(p) = cursor {
            let node = self.heap.parse(p);
            let next_raw = load_link(self.next_link(&node));
            if node.file() == file {
                match prev {
                    None => store_link(self.head(), next_raw),
                    Some(pr) => store_link(self.next_link(&self.heap.parse(pr)), next_raw),
                }
                store_link(self.next_link(&node), 0);
            } else {
                prev = Some(p);
            }
            cursor = ParseId::from_raw(next_raw);
        }
    }

    /// The live providers in registration order.
    ///
    /// Dead nodes encountered on the way are physically unlinked; this is
    /// the lazy GC that materializes deferred deletions.
    pub fn providers(&self) -> Vec<FileId> {
        let mut out = Vec::new();
        let mut prev: Option<ParseId> = None;
        let mut cursor = ParseId::from_raw(load_link(self.head()));
        while let Some(p) = cursor {
            let node = self.heap.parse(p);
            let next_raw = load_link(self.next_link(&node));
            let file = node.file();
            if self.is_live(file) {
                out.push(file);
                prev = Some(p);
            } else {
                match prev {
                    None => store_link(self.head(), next_raw),
                    Some(pr) => store_link(self.next_link(&self.heap.parse(pr)), next_raw),
                }
                store_link(self.next_link(&node), 0);
            }
            cursor = ParseId::from_raw(next_raw);
        }
        out
    }

    /// Elect `file` as this module's provider if none is chosen in the
    /// latest view. Returns whether the election happened.
    pub fn elect_provider_if_unset(&self, file: FileId, txn: u64) -> bool {
        if self.provider().read_latest().is_none() {
            self.provider().advance(Some(file), txn);
            true
        } else {
            false
        }
    }
}
