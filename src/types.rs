//! Public types for the quarry API.
//!
//! This module re-exports the types embedders need from the member crates.

// Keys
pub use quarry_core::{FileKey, FileKind, ModuleName};

// Artifacts
pub use quarry_core::{
    Aloc, AlocTable, Ast, Docblock, Exports, FileSig, Loc, TolerableFileSig, TypeSig,
};

// Error kinds
pub use quarry_core::{HeapError, LookupError, LookupResult};

// Store surface
pub use quarry_store::{DirtyModules, ParseStore, ParsedFile, StoreConfig, StoreMetrics};

// Handles
pub use quarry_heap::ParseId;
