//! Error kinds surfaced by the store.
//!
//! Lookup misses come in two forms: the `get_*` read operations return
//! `Option`s, and their `*_unsafe` counterparts return a typed
//! [`LookupError`]. Callers with a proved precondition (the file was just
//! parsed) use the unsafe form and treat a miss as a bug; defensive callers
//! use the optional form.
//!
//! Heap exhaustion is an external failure: it propagates as
//! [`HeapError::OutOfSpace`] and obliges the surrounding transaction to roll
//! back. The store never retries.

use crate::key::FileKey;
use thiserror::Error;

/// A typed lookup miss, raised by the `*_unsafe` read operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No file record exists for the key.
    #[error("file not found: {0}")]
    FileNotFound(FileKey),

    /// The file record exists but has no parse in the requested view.
    #[error("file not parsed: {0}")]
    FileNotParsed(FileKey),

    /// The file's parse is untyped and carries no checked artifacts.
    #[error("file not typed: {0}")]
    FileNotTyped(FileKey),

    /// The typed parse has no AST blob.
    #[error("AST not found: {0}")]
    AstNotFound(FileKey),

    /// The typed parse has no location table.
    #[error("aloc table not found: {0}")]
    AlocTableNotFound(FileKey),

    /// The typed parse has no docblock.
    #[error("docblock not found: {0}")]
    DocblockNotFound(FileKey),

    /// The typed parse has no requires list.
    #[error("requires not found: {0}")]
    RequiresNotFound(FileKey),

    /// The typed parse has no type signature.
    #[error("type sig not found: {0}")]
    TypeSigNotFound(FileKey),

    /// No haste module record exists for the name.
    #[error("haste module not found: {0}")]
    HasteModuleNotFound(String),

    /// No file module record exists for the key.
    #[error("file module not found: {0}")]
    FileModuleNotFound(FileKey),
}

/// Result alias for lookup operations.
pub type LookupResult<T> = std::result::Result<T, LookupError>;

/// A failure of the underlying shared heap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    /// The heap cannot satisfy a reservation.
    ///
    /// Nothing was written; the transaction in flight must roll back.
    #[error("heap out of space: requested {requested} bytes, used {used} of {capacity}")]
    OutOfSpace {
        /// Bytes the reservation asked for.
        requested: u64,
        /// Bytes already committed to records and blobs.
        used: u64,
        /// Total heap capacity.
        capacity: u64,
    },
}
