//! The two-slot versioned entity cell.
//!
//! An entity holds a value in two versions: the slot visible outside the
//! current transaction (committed) and the in-flight slot (latest). Both
//! slots pack into one `AtomicU64`, so readers always observe a consistent
//! pair. A second atomic tracks the transaction generation in which the
//! latest slot was last written.
//!
//! Commit is purely logical: advancing the global transaction counter makes
//! every entity's latest slot the committed value, because
//! [`EntityCell::committed`] returns the committed slot only while the
//! entity's generation is newer than the last committed transaction.
//!
//! Writers follow the single-writer discipline: a given entity is advanced
//! by at most one worker per transaction, so the advance/rollback paths are
//! plain load/store pairs rather than CAS loops.

use crate::handle::RawHandle;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

const LATEST_MASK: u64 = 0xffff_ffff;

fn pack(committed: u32, latest: u32) -> u64 {
    ((committed as u64) << 32) | latest as u64
}

/// Untyped two-slot cell over raw `u32` values (`0` = absent).
#[derive(Debug)]
pub struct EntityCell {
    /// Committed slot in the high 32 bits, latest in the low 32.
    slots: AtomicU64,
    /// Transaction that last wrote the latest slot; `0` after rollback or
    /// before the first advance.
    generation: AtomicU64,
}

impl EntityCell {
    /// An empty cell: both slots absent.
    pub fn new() -> Self {
        EntityCell { slots: AtomicU64::new(0), generation: AtomicU64::new(0) }
    }

    /// A cell whose value is already committed, for the saved-state load
    /// path. Both slots hold `raw` and the generation is clear.
    pub fn init_committed(raw: u32) -> Self {
        EntityCell { slots: AtomicU64::new(pack(raw, raw)), generation: AtomicU64::new(0) }
    }

    /// The latest slot.
    pub fn latest(&self) -> u32 {
        (self.slots.load(Ordering::Acquire) & LATEST_MASK) as u32
    }

    /// The slot visible outside the current transaction.
    ///
    /// `committed_txn` is the id of the most recently committed transaction.
    /// If this cell was advanced by a newer (still open) transaction, the
    /// committed slot is returned; otherwise the latest slot already is the
    /// committed value.
    pub fn committed(&self, committed_txn: u64) -> u32 {
        let generation = self.generation.load(Ordering::Acquire);
        let slots = self.slots.load(Ordering::Acquire);
        if generation > committed_txn {
            (slots >> 32) as u32
        } else {
            (slots & LATEST_MASK) as u32
        }
    }

    /// Write `raw` to the latest slot within transaction `txn`.
    ///
    /// On the first advance in a transaction the old latest value becomes
    /// the committed slot; subsequent advances in the same transaction
    /// overwrite the latest slot in place.
    pub fn advance(&self, raw: u32, txn: u64) {
        let slots = self.slots.load(Ordering::Acquire);
        if self.generation.load(Ordering::Acquire) < txn {
            let old_latest = (slots & LATEST_MASK) as u32;
            self.slots.store(pack(old_latest, raw), Ordering::Release);
            self.generation.store(txn, Ordering::Release);
        } else {
            let committed = (slots >> 32) as u32;
            self.slots.store(pack(committed, raw), Ordering::Release);
        }
    }

    /// Revert the latest slot to the committed slot if this cell was
    /// advanced by transaction `txn`. Returns whether anything changed.
    pub fn rollback(&self, txn: u64) -> bool {
        if self.generation.load(Ordering::Acquire) != txn {
            return false;
        }
        let slots = self.slots.load(Ordering::Acquire);
        let committed = (slots >> 32) as u32;
        self.slots.store(pack(committed, committed), Ordering::Release);
        self.generation.store(0, Ordering::Release);
        true
    }

    /// The generation of the last advance, `0` if none is pending.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for EntityCell {
    fn default() -> Self {
        Self::new()
    }
}

/// A typed entity over an optional handle.
#[derive(Debug, Default)]
pub struct Entity<H: RawHandle> {
    cell: EntityCell,
    _marker: PhantomData<H>,
}

impl<H: RawHandle> Entity<H> {
    /// An empty entity.
    pub fn new() -> Self {
        Entity { cell: EntityCell::new(), _marker: PhantomData }
    }

    /// An entity whose value is already committed.
    pub fn init_committed(value: Option<H>) -> Self {
        Entity { cell: EntityCell::init_committed(H::to_raw(value)), _marker: PhantomData }
    }

    /// Read the latest slot.
    pub fn read_latest(&self) -> Option<H> {
        H::from_raw(self.cell.latest())
    }

    /// Read the committed slot relative to `committed_txn`.
    pub fn read_committed(&self, committed_txn: u64) -> Option<H> {
        H::from_raw(self.cell.committed(committed_txn))
    }

    /// Advance the latest slot within `txn`.
    pub fn advance(&self, value: Option<H>, txn: u64) {
        self.cell.advance(H::to_raw(value), txn);
    }

    /// Roll back a write made by `txn`, if any.
    pub fn rollback(&self, txn: u64) -> bool {
        self.cell.rollback(txn)
    }

    /// Whether `txn` has advanced this entity.
    pub fn advanced_in(&self, txn: u64) -> bool {
        self.cell.generation() == txn
    }
}
