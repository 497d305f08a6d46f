//! Parse artifacts and their byte codecs.
//!
//! The store treats most artifacts as opaque byte strings: the parser and
//! the signature builder produce them, the heap stores them, readers hand
//! them back. Each artifact kind exposes an `encode`/`decode` pair so the
//! producer side stays swappable.
//!
//! The one structured artifact is the [`AlocTable`], the packed per-file
//! location table used to turn an abstract location ([`Aloc`]) into a
//! concrete [`Loc`]. Its pack/unpack round-trip is an identity.
//!
//! Decoding only ever runs against blobs this process (or a sibling worker)
//! wrote, so a malformed blob means the heap is corrupt; decoders panic
//! rather than propagate.

/// A serialized syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ast(pub Vec<u8>);

/// A serialized docblock (the pragma comment block at the top of a file).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Docblock(pub Vec<u8>);

/// A serialized type signature.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeSig(pub Vec<u8>);

/// Serialized exports information.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Exports(pub Vec<u8>);

macro_rules! opaque_codec {
    ($ty:ident) => {
        impl $ty {
            /// Encode to bytes.
            pub fn encode(&self) -> &[u8] {
                &self.0
            }

            /// Decode from bytes.
            pub fn decode(bytes: &[u8]) -> Self {
                $ty(bytes.to_vec())
            }

            /// Encoded size in bytes.
            pub fn byte_len(&self) -> usize {
                self.0.len()
            }
        }
    };
}

opaque_codec!(Ast);
opaque_codec!(Docblock);
opaque_codec!(TypeSig);
opaque_codec!(Exports);

/// A file signature: the modules a file requires plus an opaque signature
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileSig {
    /// Module specifiers the file imports, in source order.
    pub requires: Vec<String>,
    /// Opaque signature payload.
    pub sig: Vec<u8>,
}

/// A file signature together with the errors the signature builder tolerated
/// while producing it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TolerableFileSig {
    /// The signature proper.
    pub sig: FileSig,
    /// Serialized tolerable errors.
    pub tolerable_errors: Vec<u8>,
}

impl TolerableFileSig {
    /// Encode to bytes.
    ///
    /// Layout: requires count, then each specifier length-prefixed, then the
    /// length-prefixed signature payload, then the tolerable errors to the
    /// end of the blob. All integers are u32 little-endian.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        write_u32(&mut out, self.sig.requires.len() as u32);
        for spec in &self.sig.requires {
            write_u32(&mut out, spec.len() as u32);
            out.extend_from_slice(spec.as_bytes());
        }
        write_u32(&mut out, self.sig.sig.len() as u32);
        out.extend_from_slice(&self.sig.sig);
        out.extend_from_slice(&self.tolerable_errors);
        out
    }

    /// Decode from bytes. Panics on a malformed blob.
    pub fn decode(bytes: &[u8]) -> Self {
        let mut cursor = Cursor { bytes, pos: 0 };
        let count = cursor.read_u32() as usize;
        let mut requires = Vec::with_capacity(count);
        for _ in 0..count {
            let len = cursor.read_u32() as usize;
            let raw = cursor.read_bytes(len);
            let spec = std::str::from_utf8(raw).expect("file sig blob: non-utf8 specifier");
            requires.push(spec.to_string());
        }
        let sig_len = cursor.read_u32() as usize;
        let sig = cursor.read_bytes(sig_len).to_vec();
        let tolerable_errors = cursor.rest().to_vec();
        TolerableFileSig { sig: FileSig { requires, sig }, tolerable_errors }
    }

    /// Encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        let requires: usize = self.sig.requires.iter().map(|s| 4 + s.len()).sum();
        4 + requires + 4 + self.sig.sig.len() + self.tolerable_errors.len()
    }
}

/// An abstract location: an index into a file's [`AlocTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Aloc(pub u32);

/// A concrete source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Loc {
    /// One-based line.
    pub line: u32,
    /// Zero-based column.
    pub column: u32,
}

/// The packed per-file location table.
///
/// Built once per parse and stored as a blob; readers unpack it lazily and
/// cache the unpacked form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlocTable {
    locs: Vec<Loc>,
}

impl AlocTable {
    /// Build a table from concrete locations in table order.
    pub fn new(locs: Vec<Loc>) -> Self {
        AlocTable { locs }
    }

    /// Resolve an abstract location.
    pub fn get(&self, aloc: Aloc) -> Option<Loc> {
        self.locs.get(aloc.0 as usize).copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.locs.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.locs.is_empty()
    }

    /// Pack to bytes: u32 count, then (line, column) pairs, little-endian.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.packed_len());
        write_u32(&mut out, self.locs.len() as u32);
        for loc in &self.locs {
            write_u32(&mut out, loc.line);
            write_u32(&mut out, loc.column);
        }
        out
    }

    /// Unpack from bytes. Panics on a malformed table.
    pub fn unpack(bytes: &[u8]) -> Self {
        let mut cursor = Cursor { bytes, pos: 0 };
        let count = cursor.read_u32() as usize;
        let mut locs = Vec::with_capacity(count);
        for _ in 0..count {
            let line = cursor.read_u32();
            let column = cursor.read_u32();
            locs.push(Loc { line, column });
        }
        AlocTable { locs }
    }

    /// Packed size in bytes.
    pub fn packed_len(&self) -> usize {
        4 + self.locs.len() * 8
    }
}

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn read_u32(&mut self) -> u32 {
        let raw = self.read_bytes(4);
        u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
    }

    fn read_bytes(&mut self, len: usize) -> &'a [u8] {
        let end = self.pos.checked_add(len).expect("artifact blob: length overflow");
        assert!(end <= self.bytes.len(), "artifact blob: truncated");
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        out
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}
