//! Store-level errors.

use quarry_core::HeapError;
use thiserror::Error;

/// Errors raised by store and transaction management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A transaction is already open on this store.
    #[error("transaction {active} is already open")]
    TransactionActive {
        /// The id of the open transaction.
        active: u64,
    },

    /// The shared heap ran out of space; the transaction must roll back.
    #[error(transparent)]
    Heap(#[from] HeapError),
}

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
