//! Unified error type for the facade.
//!
//! Member-crate errors (lookup misses, heap exhaustion, transaction
//! conflicts) flow into one enum so embedders match on a single type.

use quarry_core::{HeapError, LookupError};
use quarry_store::StoreError;
use thiserror::Error;

/// All quarry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A typed lookup miss from one of the `*_unsafe` read operations.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The shared heap is out of space; roll the transaction back.
    #[error(transparent)]
    Heap(#[from] HeapError),

    /// A transaction is already open on this store.
    #[error("transaction {0} is already open")]
    TransactionActive(u64),
}

/// Result type for quarry operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this is a lookup miss (the optional `get_*` form would have
    /// returned `None`).
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, Error::Lookup(_))
    }

    /// Whether this is heap exhaustion, which obliges a rollback.
    pub fn is_out_of_space(&self) -> bool {
        matches!(self, Error::Heap(HeapError::OutOfSpace { .. }))
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::TransactionActive { active } => Error::TransactionActive(active),
            StoreError::Heap(heap) => Error::Heap(heap),
        }
    }
}
