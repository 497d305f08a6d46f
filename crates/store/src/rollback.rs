//! Rolling back a reparsed file.
//!
//! For each file a transaction changed, rollback restores the committed
//! parse and repairs the provider lists the change touched. The order of
//! operations is load-bearing:
//!
//! 1. old modules (the ones the committed parse bound the file to): roll
//!    back their provider entities, then traverse their lists while the
//!    latest parse is still the new value — the file looks dead in them, so
//!    the traversal's lazy GC physically unlinks it;
//! 2. new modules (the ones the in-flight parse bound the file to): roll
//!    back their provider entities and physically remove the file;
//! 3. roll back the file's parse entity;
//! 4. re-add the file to the old modules' lists — this only links cleanly
//!    after step 3, when committed and latest agree again.

use crate::store::ParseStore;
use quarry_core::FileKey;
use quarry_heap::ModuleRef;

impl ParseStore {
    /// Undo transaction `txn`'s write to `key`, if there was one.
    pub(crate) fn rollback_file(&self, key: &FileKey, txn: u64) {
        let Some(file_id) = self.file_id(key) else {
            return;
        };
        let file = self.heap.file(file_id);
        let entity = file.parse();
        if !entity.advanced_in(txn) {
            return;
        }

        let committed = entity.read_committed(self.committed_txn());
        let latest = entity.read_latest();
        if committed == latest {
            entity.rollback(txn);
            return;
        }

        let old_file_module = match (committed, latest) {
            (Some(_), None) => file.file_module(),
            _ => None,
        };
        let new_file_module = match (committed, latest) {
            (None, Some(_)) => file.file_module(),
            _ => None,
        };
        let mut old_haste = committed.and_then(|p| self.heap.parse(p).haste_module());
        let mut new_haste = latest.and_then(|p| self.heap.parse(p).haste_module());
        if old_haste == new_haste {
            // Same module on both sides: no list edits are needed.
            old_haste = None;
            new_haste = None;
        }

        let old_modules = [
            old_file_module.map(ModuleRef::File),
            old_haste.map(ModuleRef::Haste),
        ];
        let new_modules = [
            new_file_module.map(ModuleRef::File),
            new_haste.map(ModuleRef::Haste),
        ];

        for module in old_modules.into_iter().flatten() {
            let lock = self.heap.lock_module(module);
            lock.provider().rollback(txn);
            let _ = lock.providers();
        }

        for module in new_modules.into_iter().flatten() {
            let lock = self.heap.lock_module(module);
            lock.provider().rollback(txn);
            lock.remove_provider(file_id);
        }

        entity.rollback(txn);

        if let Some(restored) = entity.read_latest() {
            for module in old_modules.into_iter().flatten() {
                self.heap.lock_module(module).add_provider(restored);
            }
        }
    }
}
