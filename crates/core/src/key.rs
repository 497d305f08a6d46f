//! File and module keys.
//!
//! Every record in the store is addressed by a [`FileKey`]; every module by a
//! [`ModuleName`]. Keys are plain values — cheap to hash, clone, and
//! serialize — and carry no handles into the heap.

use serde::{Deserialize, Serialize};

/// The kind of a storable file.
///
/// `Builtins` is deliberately not a kind: builtins are resolvable as a
/// [`FileKey`] but can never be stored, so no record ever carries a kind for
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    /// A source file subject to type checking.
    Source,
    /// A JSON module.
    Json,
    /// A resource module (asset imports).
    Resource,
    /// A library definition file. Lib files have no eponymous file module.
    Lib,
}

/// Identifies a file known to the store.
///
/// The path-carrying variants name real files; `Builtins` names the ambient
/// builtin definitions, which are loaded by other means and must never be
/// published into the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKey {
    /// A checked source file.
    Source(String),
    /// A JSON module.
    Json(String),
    /// A resource module.
    Resource(String),
    /// A library definition file.
    Lib(String),
    /// The ambient builtins. Not storable.
    Builtins,
}

impl FileKey {
    /// The kind of this key, or `None` for `Builtins`.
    pub fn kind(&self) -> Option<FileKind> {
        match self {
            FileKey::Source(_) => Some(FileKind::Source),
            FileKey::Json(_) => Some(FileKind::Json),
            FileKey::Resource(_) => Some(FileKind::Resource),
            FileKey::Lib(_) => Some(FileKind::Lib),
            FileKey::Builtins => None,
        }
    }

    /// The path this key names, or `None` for `Builtins`.
    pub fn path(&self) -> Option<&str> {
        match self {
            FileKey::Source(p) | FileKey::Json(p) | FileKey::Resource(p) | FileKey::Lib(p) => {
                Some(p)
            }
            FileKey::Builtins => None,
        }
    }

    /// Whether a file record may be created for this key.
    pub fn is_storable(&self) -> bool {
        !matches!(self, FileKey::Builtins)
    }

    /// Whether this key names a library definition file.
    pub fn is_lib(&self) -> bool {
        matches!(self, FileKey::Lib(_))
    }

    /// Whether this key has an eponymous file module.
    ///
    /// Lib files are importable only through haste names, and builtins are
    /// not files at all, so neither gets a file module.
    pub fn has_file_module(&self) -> bool {
        self.is_storable() && !self.is_lib()
    }
}

impl std::fmt::Display for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKey::Source(p) => write!(f, "{}", p),
            FileKey::Json(p) => write!(f, "{}", p),
            FileKey::Resource(p) => write!(f, "{}", p),
            FileKey::Lib(p) => write!(f, "[lib] {}", p),
            FileKey::Builtins => write!(f, "[builtins]"),
        }
    }
}

/// Identifies a module.
///
/// A haste module is named by a declared string and may be provided by any
/// file declaring that name; a file module is named by a file key and is
/// provided by exactly that file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleName {
    /// A module declared by name.
    Haste(String),
    /// The eponymous module of a file.
    File(FileKey),
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleName::Haste(name) => write!(f, "haste:{}", name),
            ModuleName::File(key) => write!(f, "file:{}", key),
        }
    }
}
