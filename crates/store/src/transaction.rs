//! Transactions.
//!
//! A transaction is a master-coordinated batch of writes ended by exactly
//! one commit or rollback. Mutators register commit/rollback hooks under a
//! singleton name; registering the same name twice in one transaction is a
//! no-op, so a mutator constructed twice does not double its bookkeeping.
//!
//! Committing is logical: the store's transaction counter advances, which
//! retroactively makes every entity's latest slot the committed value. The
//! heavy lifting (cache invalidation, table deletions, per-file rollback)
//! happens in the hooks.
//!
//! Dropping a transaction without finishing it rolls it back.

use crate::error::StoreResult;
use crate::store::ParseStore;
use rustc_hash::FxHashSet;
use std::sync::Arc;

type HookFn = Box<dyn FnOnce() + Send>;

/// A named commit/rollback hook pair.
pub(crate) struct Hook {
    name: String,
    commit: HookFn,
    rollback: HookFn,
}

impl Hook {
    pub(crate) fn fire_commit(self) {
        tracing::debug!(hook = %self.name, "running commit hook");
        (self.commit)();
    }

    pub(crate) fn fire_rollback(self) {
        tracing::debug!(hook = %self.name, "running rollback hook");
        (self.rollback)();
    }
}

/// An open transaction on a [`ParseStore`].
pub struct Transaction {
    store: Arc<ParseStore>,
    id: u64,
    hooks: Vec<Hook>,
    names: FxHashSet<String>,
    finished: bool,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("finished", &self.finished)
            .finish()
    }
}

impl Transaction {
    /// Open the next transaction on `store`.
    ///
    /// Fails with [`crate::StoreError::TransactionActive`] if one is
    /// already open.
    pub fn begin(store: &Arc<ParseStore>) -> StoreResult<Transaction> {
        let id = store.try_begin()?;
        Ok(Transaction {
            store: Arc::clone(store),
            id,
            hooks: Vec::new(),
            names: FxHashSet::default(),
            finished: false,
        })
    }

    /// This transaction's id. Greater than every committed id until commit.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The store this transaction runs against.
    pub fn store(&self) -> &Arc<ParseStore> {
        &self.store
    }

    /// Register a commit/rollback hook pair under a singleton name.
    ///
    /// The first registration per name wins; later ones are dropped.
    pub fn add(
        &mut self,
        singleton: &str,
        commit: impl FnOnce() + Send + 'static,
        rollback: impl FnOnce() + Send + 'static,
    ) {
        if !self.names.insert(singleton.to_string()) {
            return;
        }
        self.hooks.push(Hook {
            name: singleton.to_string(),
            commit: Box::new(commit),
            rollback: Box::new(rollback),
        });
    }

    /// Commit: advance the store's counter and fire commit hooks once.
    pub fn commit(mut self) {
        self.finished = true;
        let hooks = std::mem::take(&mut self.hooks);
        self.store.finish_commit(self.id, hooks);
    }

    /// Roll back: fire rollback hooks once; the counter is untouched.
    pub fn rollback(mut self) {
        self.finished = true;
        let hooks = std::mem::take(&mut self.hooks);
        self.store.finish_rollback(self.id, hooks);
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(txn = self.id, "transaction dropped without commit; rolling back");
            let hooks = std::mem::take(&mut self.hooks);
            self.store.finish_rollback(self.id, hooks);
        }
    }
}
