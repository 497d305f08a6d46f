//! # quarry-heap
//!
//! The shared heap underneath the quarry store: a capacity-accounted arena
//! of records and blobs addressed by opaque handles, a string interner, the
//! two-slot versioned entity cell, and the intrusive provider lists anchored
//! on module records.
//!
//! ## Design
//!
//! - Records live in sharded handle tables (`DashMap`); a handle is a
//!   `NonZeroU32` index, so `Option<Handle>` packs into a raw `u32` with `0`
//!   as the none sentinel and fits in an atomic.
//! - Allocation is all-or-nothing: [`Heap::alloc`] reserves the precomputed
//!   byte size up front and only then runs the writer callback, so a
//!   publication either lands completely or not at all.
//! - Records reference each other by handle. Nothing is ever deallocated;
//!   the store deletes by dropping keys from its own tables.
//! - Provider-list mutation and traversal require the module's exclusive
//!   lock, expressed in the API by [`ModuleLock`].

pub mod arena;
pub mod entity;
pub mod handle;
pub mod intern;
pub mod list;
pub mod record;

pub use arena::{AllocSize, Chunk, Heap};
pub use entity::{Entity, EntityCell};
pub use handle::{BlobId, FileId, FileModuleId, HasteModuleId, ParseId, StringId};
pub use list::{ModuleLock, ModuleRef};
pub use record::{FileRecord, FileModuleRecord, HasteModuleRecord, ParseRecord, TypedParse};
