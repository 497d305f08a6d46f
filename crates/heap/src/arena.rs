//! The shared arena.
//!
//! Records and blobs live in sharded handle tables; handles are dense `u32`
//! indices drawn from per-kind atomic counters. The arena is append-only —
//! nothing is ever freed — so a handle, once returned, stays valid for the
//! life of the heap.
//!
//! ## Allocation protocol
//!
//! Writers precompute the byte size of everything a publication will write
//! (an [`AllocSize`]), then call [`Heap::alloc`]. The size is reserved
//! against the heap's capacity up front; only if the reservation succeeds
//! does the writer callback run, and the callback's writes are infallible.
//! A publication therefore lands in full or not at all, and exhaustion
//! surfaces as [`HeapError::OutOfSpace`] before any record is written.

use crate::handle::{BlobId, FileId, FileModuleId, HasteModuleId, ParseId, StringId};
use crate::intern::Interner;
use crate::record::{FileRecord, FileModuleRecord, HasteModuleRecord, ParseRecord};
use dashmap::DashMap;
use parking_lot::Mutex;
use quarry_core::HeapError;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Default heap capacity: enough for mid-size projects, overridable through
/// the store builder.
pub const DEFAULT_CAPACITY: u64 = 256 * 1024 * 1024;

const MODULE_LOCK_STRIPES: usize = 64;

/// Fixed per-entry table overhead charged on top of payload bytes.
const SLOT_OVERHEAD: u64 = 16;

/// A precomputed allocation size in bytes.
///
/// Built by summing the record and blob costs of a publication before
/// calling [`Heap::alloc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocSize(u64);

impl AllocSize {
    /// The empty size.
    pub const ZERO: AllocSize = AllocSize(0);

    /// Cost of a file record.
    pub fn file_record() -> AllocSize {
        AllocSize(std::mem::size_of::<FileRecord>() as u64 + SLOT_OVERHEAD)
    }

    /// Cost of a parse record (typed or untyped; the typed artifact handles
    /// are inline).
    pub fn parse_record() -> AllocSize {
        AllocSize(std::mem::size_of::<ParseRecord>() as u64 + SLOT_OVERHEAD)
    }

    /// Cost of a file-module record.
    pub fn file_module_record() -> AllocSize {
        AllocSize(std::mem::size_of::<FileModuleRecord>() as u64 + SLOT_OVERHEAD)
    }

    /// Cost of a haste-module record.
    pub fn haste_module_record() -> AllocSize {
        AllocSize(std::mem::size_of::<HasteModuleRecord>() as u64 + SLOT_OVERHEAD)
    }

    /// Cost of a blob of `len` bytes.
    pub fn blob(len: usize) -> AllocSize {
        AllocSize(len as u64 + SLOT_OVERHEAD)
    }

    /// Cost of interning a string of `len` bytes (charged only if the
    /// string is new to the interner).
    pub fn string(len: usize) -> AllocSize {
        AllocSize(len as u64 + SLOT_OVERHEAD)
    }

    /// Sum of two sizes.
    pub fn and(self, other: AllocSize) -> AllocSize {
        AllocSize(self.0 + other.0)
    }

    /// Total bytes.
    pub fn bytes(self) -> u64 {
        self.0
    }
}

/// The process-shared heap.
pub struct Heap {
    files: DashMap<u32, Arc<FileRecord>, FxBuildHasher>,
    parses: DashMap<u32, Arc<ParseRecord>, FxBuildHasher>,
    file_modules: DashMap<u32, Arc<FileModuleRecord>, FxBuildHasher>,
    haste_modules: DashMap<u32, Arc<HasteModuleRecord>, FxBuildHasher>,
    blobs: DashMap<u32, Arc<[u8]>, FxBuildHasher>,
    interner: Interner,

    next_file: AtomicU32,
    next_parse: AtomicU32,
    next_file_module: AtomicU32,
    next_haste_module: AtomicU32,
    next_blob: AtomicU32,

    used: AtomicU64,
    capacity: u64,

    pub(crate) module_locks: Box<[Mutex<()>]>,
}

impl Heap {
    /// Create a heap with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a heap with an explicit byte capacity.
    pub fn with_capacity(capacity: u64) -> Self {
        let module_locks: Vec<Mutex<()>> =
            (0..MODULE_LOCK_STRIPES).map(|_| Mutex::new(())).collect();
        Heap {
            files: DashMap::with_hasher(FxBuildHasher),
            parses: DashMap::with_hasher(FxBuildHasher),
            file_modules: DashMap::with_hasher(FxBuildHasher),
            haste_modules: DashMap::with_hasher(FxBuildHasher),
            blobs: DashMap::with_hasher(FxBuildHasher),
            interner: Interner::new(),
            next_file: AtomicU32::new(1),
            next_parse: AtomicU32::new(1),
            next_file_module: AtomicU32::new(1),
            next_haste_module: AtomicU32::new(1),
            next_blob: AtomicU32::new(1),
            used: AtomicU64::new(0),
            capacity,
            module_locks: module_locks.into_boxed_slice(),
        }
    }

    /// Reserve `size` bytes and run `f` with a writer over the reservation.
    ///
    /// Returns [`HeapError::OutOfSpace`] — without running `f` — if the
    /// reservation does not fit.
    pub fn alloc<T>(
        &self,
        size: AllocSize,
        f: impl FnOnce(&mut Chunk<'_>) -> T,
    ) -> Result<T, HeapError> {
        self.reserve(size)?;
        let mut chunk = Chunk { heap: self, remaining: size.bytes() };
        Ok(f(&mut chunk))
    }

    fn reserve(&self, size: AllocSize) -> Result<(), HeapError> {
        let requested = size.bytes();
        let mut used = self.used.load(Ordering::Relaxed);
        loop {
            let new_used = used.saturating_add(requested);
            if new_used > self.capacity {
                return Err(HeapError::OutOfSpace { requested, used, capacity: self.capacity });
            }
            match self.used.compare_exchange_weak(
                used,
                new_used,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(current) => used = current,
            }
        }
    }

    /// Look up a file record.
    pub fn file(&self, id: FileId) -> Arc<FileRecord> {
        self.files.get(&id.index()).expect("dangling file handle").clone()
    }

    /// Look up a parse record.
    pub fn parse(&self, id: ParseId) -> Arc<ParseRecord> {
        self.parses.get(&id.index()).expect("dangling parse handle").clone()
    }

    /// Look up a file-module record.
    pub fn file_module(&self, id: FileModuleId) -> Arc<FileModuleRecord> {
        self.file_modules.get(&id.index()).expect("dangling file module handle").clone()
    }

    /// Look up a haste-module record.
    pub fn haste_module(&self, id: HasteModuleId) -> Arc<HasteModuleRecord> {
        self.haste_modules.get(&id.index()).expect("dangling haste module handle").clone()
    }

    /// Look up a blob.
    pub fn blob(&self, id: BlobId) -> Arc<[u8]> {
        self.blobs.get(&id.index()).expect("dangling blob handle").clone()
    }

    /// Resolve an interned string.
    pub fn resolve_string(&self, id: StringId) -> Arc<str> {
        self.interner.resolve(id)
    }

    /// Bytes currently allocated.
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Acquire)
    }

    /// Total byte capacity.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Number of file records.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of parse records.
    pub fn parse_count(&self) -> usize {
        self.parses.len()
    }

    /// Number of file-module records.
    pub fn file_module_count(&self) -> usize {
        self.file_modules.len()
    }

    /// Number of haste-module records.
    pub fn haste_module_count(&self) -> usize {
        self.haste_modules.len()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("files", &self.file_count())
            .field("parses", &self.parse_count())
            .field("file_modules", &self.file_module_count())
            .field("haste_modules", &self.haste_module_count())
            .field("used", &self.used())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// A writer over a successful reservation.
///
/// Every write debits the reservation; in debug builds, overrunning the
/// reserved size is a programmer error and asserts. Whatever the writer did
/// not spend (an interned string that already existed, a module another
/// worker created first) is refunded when the chunk is dropped, so `used`
/// reflects bytes actually written.
pub struct Chunk<'a> {
    heap: &'a Heap,
    remaining: u64,
}

impl Drop for Chunk<'_> {
    fn drop(&mut self) {
        if self.remaining > 0 {
            self.heap.used.fetch_sub(self.remaining, Ordering::AcqRel);
            self.remaining = 0;
        }
    }
}

impl<'a> Chunk<'a> {
    /// Intern a string, charging the reservation only if it is new.
    pub fn intern(&mut self, s: &str) -> StringId {
        let (id, fresh) = self.heap.interner.intern(s);
        if fresh {
            self.debit(AllocSize::string(s.len()));
        }
        id
    }

    /// Write a blob.
    pub fn write_blob(&mut self, bytes: &[u8]) -> BlobId {
        self.debit(AllocSize::blob(bytes.len()));
        let id = self.heap.next_blob.fetch_add(1, Ordering::Relaxed);
        self.heap.blobs.insert(id, Arc::from(bytes));
        BlobId::new(id)
    }

    /// Write a file record.
    pub fn write_file(&mut self, record: FileRecord) -> FileId {
        self.debit(AllocSize::file_record());
        let id = self.heap.next_file.fetch_add(1, Ordering::Relaxed);
        self.heap.files.insert(id, Arc::new(record));
        FileId::new(id)
    }

    /// Write a parse record.
    pub fn write_parse(&mut self, record: ParseRecord) -> ParseId {
        self.debit(AllocSize::parse_record());
        let id = self.heap.next_parse.fetch_add(1, Ordering::Relaxed);
        self.heap.parses.insert(id, Arc::new(record));
        ParseId::new(id)
    }

    /// Write a file-module record.
    pub fn write_file_module(&mut self, record: FileModuleRecord) -> FileModuleId {
        self.debit(AllocSize::file_module_record());
        let id = self.heap.next_file_module.fetch_add(1, Ordering::Relaxed);
        self.heap.file_modules.insert(id, Arc::new(record));
        FileModuleId::new(id)
    }

    /// Write a haste-module record.
    pub fn write_haste_module(&mut self, record: HasteModuleRecord) -> HasteModuleId {
        self.debit(AllocSize::haste_module_record());
        let id = self.heap.next_haste_module.fetch_add(1, Ordering::Relaxed);
        self.heap.haste_modules.insert(id, Arc::new(record));
        HasteModuleId::new(id)
    }

    fn debit(&mut self, cost: AllocSize) {
        debug_assert!(
            self.remaining >= cost.bytes(),
            "chunk overrun: {} bytes remaining, {} requested",
            self.remaining,
            cost.bytes()
        );
        self.remaining = self.remaining.saturating_sub(cost.bytes());
    }
}
