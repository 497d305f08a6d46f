//! Main entry point.
//!
//! [`Quarry`] wraps the shared [`ParseStore`] and hands out transactions,
//! mutators, and readers. One `Quarry` per checker instance; clone-cheap
//! because everything inside is shared.

use crate::error::Result;
use crate::types::FileKey;
use quarry_store::{
    CommitModulesMutator, ParseMutator, ParseStore, ReparseMutator, SavedStateLoader, StoreConfig,
    StoreMetrics, StoreReader, Transaction,
};
use std::sync::Arc;

/// The quarry store.
///
/// # Example
///
/// ```ignore
/// use quarry::prelude::*;
///
/// let quarry = Quarry::builder()
///     .heap_capacity(64 * 1024 * 1024)
///     .build();
///
/// let mut txn = quarry.begin_transaction()?;
/// let reparse = quarry.reparse_mutator(&mut txn, changed_keys);
/// // ... workers publish through `reparse` ...
/// txn.commit();
/// ```
#[derive(Clone, Debug)]
pub struct Quarry {
    inner: Arc<ParseStore>,
}

impl Quarry {
    /// Create a store with default configuration.
    pub fn new() -> Self {
        Self::ephemeral()
    }

    /// Create an ephemeral store with default configuration.
    ///
    /// Everything lives in memory and is gone when the last handle drops.
    /// This is the store every fresh checker run starts from; tests use it
    /// for maximum isolation.
    pub fn ephemeral() -> Self {
        Self::builder().build()
    }

    /// Create a builder for store configuration.
    pub fn builder() -> QuarryBuilder {
        QuarryBuilder::new()
    }

    /// Open the next transaction. At most one may be open at a time.
    pub fn begin_transaction(&self) -> Result<Transaction> {
        Ok(Transaction::begin(&self.inner)?)
    }

    /// A mutator for fresh parsing within `txn`.
    pub fn parse_mutator(&self, txn: &Transaction) -> ParseMutator {
        ParseMutator::new(&self.inner, txn)
    }

    /// A mutator for reparsing `files` within `txn`, with rollback support.
    pub fn reparse_mutator(
        &self,
        txn: &mut Transaction,
        files: impl IntoIterator<Item = FileKey>,
    ) -> ReparseMutator {
        ReparseMutator::new(&self.inner, txn, files)
    }

    /// A mutator for the provider-selection and module-commit stage.
    pub fn commit_modules_mutator(&self, txn: &mut Transaction) -> CommitModulesMutator {
        CommitModulesMutator::new(&self.inner, txn)
    }

    /// The saved-state loader. Call before the first transaction.
    pub fn saved_state_loader(&self) -> SavedStateLoader {
        SavedStateLoader::new(&self.inner)
    }

    /// A reader over the latest view (the mutator reader), for use inside a
    /// transaction.
    pub fn latest(&self) -> StoreReader {
        StoreReader::mutator(&self.inner)
    }

    /// A reader over the committed view.
    pub fn committed(&self) -> StoreReader {
        StoreReader::committed(&self.inner)
    }

    /// A reader that follows the store: latest inside a transaction,
    /// committed outside.
    pub fn dispatcher(&self) -> StoreReader {
        StoreReader::dispatcher(&self.inner)
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    /// The live providers of `module`, in registration order, under the
    /// module's exclusive lock.
    pub fn all_providers(&self, module: &crate::types::ModuleName) -> Result<Vec<FileKey>> {
        Ok(self.inner.all_providers_exclusive(module)?)
    }

    /// Sample store counters.
    pub fn metrics(&self) -> StoreMetrics {
        self.inner.metrics()
    }

    /// The shared store value, for embedders that pass it explicitly.
    pub fn store(&self) -> &Arc<ParseStore> {
        &self.inner
    }
}

impl Default for Quarry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for store configuration.
///
/// # Example
///
/// ```ignore
/// // Small heap and caches for tests.
/// let quarry = Quarry::builder()
///     .heap_capacity(1024 * 1024)
///     .cache_capacity(16)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct QuarryBuilder {
    config: StoreConfig,
}

impl QuarryBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        QuarryBuilder { config: StoreConfig::default() }
    }

    /// Set the shared heap capacity in bytes.
    pub fn heap_capacity(mut self, bytes: u64) -> Self {
        self.config.heap_capacity = bytes;
        self
    }

    /// Set the per-process read cache capacity, in entries.
    pub fn cache_capacity(mut self, entries: usize) -> Self {
        self.config.cache_capacity = entries;
        self
    }

    /// Build the store.
    pub fn build(self) -> Quarry {
        Quarry { inner: Arc::new(ParseStore::with_config(self.config)) }
    }
}

impl Default for QuarryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
