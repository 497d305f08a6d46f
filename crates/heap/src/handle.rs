//! Handle types.
//!
//! A handle is a non-owning `NonZeroU32` index into one of the heap's record
//! tables. Handles are `Copy`, hashable, and pack into atomics via the
//! `raw`/`from_raw` pair, where `0` encodes `None`. Cycles between records
//! (files point at modules, module lists point back at files' parses) are
//! plain handle fields; no reference counting is involved.

use std::num::NonZeroU32;

/// Conversion between optional handles and their raw atomic encoding.
pub trait RawHandle: Copy {
    /// Encode an optional handle; `None` becomes `0`.
    fn to_raw(value: Option<Self>) -> u32;
    /// Decode a raw value; `0` becomes `None`.
    fn from_raw(raw: u32) -> Option<Self>;
}

macro_rules! handle_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Wrap a raw index. Index `0` is reserved for the none sentinel.
            pub(crate) fn new(raw: u32) -> Self {
                $name(NonZeroU32::new(raw).expect("handle index 0 is reserved"))
            }

            /// The raw index.
            pub fn index(self) -> u32 {
                self.0.get()
            }
        }

        impl crate::handle::RawHandle for $name {
            fn to_raw(value: Option<Self>) -> u32 {
                value.map_or(0, |h| h.0.get())
            }

            fn from_raw(raw: u32) -> Option<Self> {
                NonZeroU32::new(raw).map($name)
            }
        }
    };
}

handle_type! {
    /// Handle to a file record.
    FileId
}
handle_type! {
    /// Handle to a parse record.
    ParseId
}
handle_type! {
    /// Handle to a file-module record.
    FileModuleId
}
handle_type! {
    /// Handle to a haste-module record.
    HasteModuleId
}
handle_type! {
    /// Handle to a blob.
    BlobId
}
handle_type! {
    /// Handle to an interned string.
    StringId
}
