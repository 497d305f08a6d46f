//! # Quarry
//!
//! A concurrent, transactional shared store for the parse artifacts and
//! module-resolution graph of an incremental type checker.
//!
//! Workers parse files in parallel and publish artifacts (syntax tree,
//! docblock, signatures, location table, exports) into the store; a master
//! process commits or rolls back each batch atomically; readers observe
//! either the committed snapshot or the latest in-flight data without
//! copying.
//!
//! ## Quick Start
//!
//! ```ignore
//! use quarry::prelude::*;
//!
//! let quarry = Quarry::new();
//!
//! // Publish a batch of fresh parses.
//! let txn = quarry.begin_transaction()?;
//! let mutator = quarry.parse_mutator(&txn);
//! let dirty = mutator.add_parsed(&FileKey::Source("a.js".into()), &parsed)?;
//! txn.commit();
//!
//! // Read the committed snapshot.
//! let reader = quarry.committed();
//! let ast = reader.get_ast(&FileKey::Source("a.js".into()));
//! ```
//!
//! ## Views
//!
//! Every entity in the store (a file's current parse, a module's chosen
//! provider) is readable in two versions: the value visible outside the
//! open transaction and the latest in-flight value. Commit is logical — a
//! counter advance — so readers never block writers and rollback restores
//! the committed view exactly.

#![warn(missing_docs)]

mod error;
mod store;
mod types;

pub mod prelude;

// Main entry points
pub use store::{Quarry, QuarryBuilder};

// Error handling
pub use error::{Error, Result};

// Core types
pub use types::*;
