//! Snapshot node types

use crate::types::{Fingerprint, Identity};
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// File as seen by one reconciliation pass
#[derive(Debug)]
pub struct FileSnapshot {
    pub(crate) identity: Identity,
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) size: u64,
    pub(crate) modified: SystemTime,
    pub(crate) fingerprint: OnceCell<Fingerprint>,
}

impl FileSnapshot {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Fingerprint if it has already been computed for this snapshot
    pub fn cached_fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint.get().copied()
    }
}

/// Children of a directory, keyed by identity
///
/// Ordered maps keep iteration (and therefore rename tie-breaking) stable between runs.
#[derive(Debug, Default)]
pub struct Listing {
    pub files: BTreeMap<Identity, FileSnapshot>,
    pub directories: BTreeMap<Identity, DirectorySnapshot>,
    /// Names of entries that exist but could not be inspected this pass
    pub skipped: BTreeSet<String>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty() && self.skipped.is_empty()
    }

    /// Whether every entry on disk made it into the listing
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Directory as seen by one reconciliation pass
///
/// The listing is read lazily and at most once, so a directory whose contents are
/// never inspected never costs a scan.
#[derive(Debug)]
pub struct DirectorySnapshot {
    pub(crate) identity: Identity,
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) listing: OnceCell<Listing>,
    pub(crate) fingerprint: OnceCell<Fingerprint>,
}

impl DirectorySnapshot {
    pub(crate) fn unlisted(name: String, path: PathBuf) -> Self {
        Self {
            identity: Identity::new(),
            name,
            path,
            listing: OnceCell::new(),
            fingerprint: OnceCell::new(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the children have been read from disk yet
    pub fn is_listed(&self) -> bool {
        self.listing.get().is_some()
    }
}
