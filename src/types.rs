//! Core types for the treemirror reconciliation engine.

/// Fingerprint: BLAKE3 digest of a file's bytes or of a directory's children
pub type Fingerprint = [u8; 32];

/// Identity: key used to match an entity between source and replica within one parent
pub type Identity = String;

/// Kind of a filesystem entity as seen by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    File,
    Directory,
}
