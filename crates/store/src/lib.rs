//! # quarry-store
//!
//! The transactional core of the quarry store: global key→record tables over
//! the shared heap, the publish/rollback protocol for parse artifacts and
//! module providers, dirty-module bookkeeping, and the reader flavors.
//!
//! ## Shape
//!
//! - [`ParseStore`] — the store value itself. Process-wide singletons
//!   (file table, module tables, transaction counter) live here and are
//!   passed explicitly; only the outermost embedder should hold it as a
//!   global.
//! - [`Transaction`] — a master-coordinated batch of writes, ended by
//!   exactly one commit or rollback, with singleton-named hooks.
//! - Mutators ([`ParseMutator`], [`ReparseMutator`], [`CommitModulesMutator`],
//!   [`SavedStateLoader`]) — the worker-facing write surfaces.
//! - [`StoreReader`] — the uniform read API over the latest or committed
//!   view, with per-process AST and location-table caches in front.

#![warn(missing_docs)]

mod cache;
mod error;
mod mutator;
mod publish;
mod reader;
mod rollback;
mod store;
mod transaction;

pub use error::{StoreError, StoreResult};
pub use mutator::{CommitModulesMutator, ParseMutator, ReparseMutator, SavedStateLoader};
pub use publish::{DirtyModules, ParsedFile};
pub use reader::StoreReader;
pub use store::{ParseStore, StoreConfig, StoreMetrics};
pub use transaction::Transaction;
