//! Convenient imports for quarry.
//!
//! This module re-exports the most commonly used types so you can get
//! started with a single import:
//!
//! ```ignore
//! use quarry::prelude::*;
//!
//! let quarry = Quarry::new();
//! let reader = quarry.committed();
//! ```

// Main entry point
pub use crate::store::{Quarry, QuarryBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Keys and artifacts
pub use crate::types::{
    Aloc, AlocTable, Ast, Docblock, Exports, FileKey, FileKind, FileSig, Loc, ModuleName,
    TolerableFileSig, TypeSig,
};

// Error kinds
pub use crate::types::{HeapError, LookupError, LookupResult};

// Store surface
pub use crate::types::{DirtyModules, ParsedFile, StoreMetrics};

// Reader and mutator types
pub use quarry_store::{
    CommitModulesMutator, ParseMutator, ReparseMutator, SavedStateLoader, StoreReader, Transaction,
};
