//! # quarry-core
//!
//! Key, artifact, and error types shared by every layer of the quarry store.
//!
//! This crate is dependency-light on purpose: the heap and store crates both
//! build on it, and embedders that only need to *name* things (keys, module
//! names, lookup errors) can depend on it alone.
//!
//! - [`key`] — [`FileKey`], [`ModuleName`], and [`FileKind`]
//! - [`artifact`] — opaque parse artifact blobs and the packed location table
//! - [`error`] — [`LookupError`] and [`HeapError`]

#![warn(missing_docs)]

pub mod artifact;
pub mod error;
pub mod key;

pub use artifact::{Aloc, AlocTable, Ast, Docblock, Exports, FileSig, Loc, TolerableFileSig, TypeSig};
pub use error::{HeapError, LookupError, LookupResult};
pub use key::{FileKey, FileKind, ModuleName};
