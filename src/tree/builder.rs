//! Snapshot builder
//!
//! Turns directories on disk into [`DirectorySnapshot`]s. Listings and fingerprints
//! are computed on first use and cached inside the snapshot, so a directory is read
//! at most once and a file hashed at most once per snapshot instance.
//!
//! An entry that cannot be inspected is left out of its listing, remembered by name in
//! [`Listing::skipped`], and its error is held until the pass collects it with
//! [`SnapshotBuilder::take_skipped`].

use super::hasher;
use super::node::{DirectorySnapshot, FileSnapshot, Listing};
use crate::error::StorageError;
use crate::fs::{entry_name, FileSystem};
use crate::strategy::IdentityStrategy;
use crate::types::{EntityKind, Fingerprint};
use std::cell::{OnceCell, RefCell};
use std::path::Path;
use std::sync::Arc;
use tracing::{trace, warn};

/// Builds snapshots through the filesystem adapter using the active identity strategy
pub struct SnapshotBuilder {
    fs: Arc<dyn FileSystem>,
    identity: Arc<dyn IdentityStrategy>,
    unreported: RefCell<Vec<StorageError>>,
}

impl SnapshotBuilder {
    pub fn new(fs: Arc<dyn FileSystem>, identity: Arc<dyn IdentityStrategy>) -> Self {
        Self {
            fs,
            identity,
            unreported: RefCell::new(Vec::new()),
        }
    }

    /// Errors of entries left out of listings since the last call
    pub fn take_skipped(&self) -> Vec<StorageError> {
        std::mem::take(&mut *self.unreported.borrow_mut())
    }

    /// Snapshot a directory that is visited as the root of a reconciliation level
    ///
    /// Its listing is read immediately. Level roots are paired by path, so their
    /// identity is simply their name.
    pub fn scan(&self, path: &Path) -> Result<DirectorySnapshot, StorageError> {
        let name = path.file_name().map(entry_name).unwrap_or_default();
        let mut dir = DirectorySnapshot::unlisted(name, path.to_path_buf());
        dir.identity = dir.name.clone();
        self.listing(&dir)?;
        Ok(dir)
    }

    /// Children of `dir`, read from disk on first access
    pub fn listing<'d>(&self, dir: &'d DirectorySnapshot) -> Result<&'d Listing, StorageError> {
        if let Some(listing) = dir.listing.get() {
            return Ok(listing);
        }
        let listing = self.read_listing(&dir.path)?;
        Ok(dir.listing.get_or_init(|| listing))
    }

    /// Content fingerprint of a file, hashed on first access
    pub fn file_fingerprint(&self, file: &FileSnapshot) -> Result<Fingerprint, StorageError> {
        if let Some(fingerprint) = file.fingerprint.get() {
            return Ok(*fingerprint);
        }
        let reader = self.fs.open_read(&file.path)?;
        let fingerprint =
            hasher::fingerprint_reader(reader).map_err(|e| StorageError::io(&file.path, e))?;
        trace!(path = %file.path.display(), fingerprint = %hex::encode(fingerprint), "Hashed file");
        Ok(*file.fingerprint.get_or_init(|| fingerprint))
    }

    /// Aggregate fingerprint of a directory over its whole subtree
    ///
    /// Fails when any listing in the subtree is incomplete.
    pub fn directory_fingerprint(&self, dir: &DirectorySnapshot) -> Result<Fingerprint, StorageError> {
        if let Some(fingerprint) = dir.fingerprint.get() {
            return Ok(*fingerprint);
        }
        let listing = self.listing(dir)?;
        if !listing.is_complete() {
            return Err(StorageError::IncompleteListing(dir.path.clone()));
        }

        let mut files = Vec::with_capacity(listing.files.len());
        for file in listing.files.values() {
            files.push((file.name.as_str(), self.file_fingerprint(file)?));
        }
        let mut directories = Vec::with_capacity(listing.directories.len());
        for child in listing.directories.values() {
            directories.push((child.name.as_str(), self.directory_fingerprint(child)?));
        }

        let fingerprint = hasher::compute_directory_fingerprint(files, directories);
        Ok(*dir.fingerprint.get_or_init(|| fingerprint))
    }

    fn read_listing(&self, path: &Path) -> Result<Listing, StorageError> {
        let mut listing = Listing::default();

        for entry in self.fs.list_dir(path)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let name = e.path().file_name().map(entry_name).unwrap_or_default();
                    self.skip(&mut listing, name, e);
                    continue;
                }
            };

            match entry.kind {
                Some(EntityKind::File) => {
                    let mut file = FileSnapshot {
                        identity: String::new(),
                        name: entry.name,
                        path: entry.path,
                        size: entry.size,
                        modified: entry.modified,
                        fingerprint: OnceCell::new(),
                    };
                    match self.identity.file_identity(&file, self) {
                        Ok(identity) => file.identity = identity,
                        Err(e) => {
                            self.skip(&mut listing, file.name, e);
                            continue;
                        }
                    }
                    if let Some(previous) = listing.files.insert(file.identity.clone(), file) {
                        warn!(path = %previous.path.display(), "Duplicate file identity, entry ignored");
                    }
                }
                Some(EntityKind::Directory) => {
                    let mut dir = DirectorySnapshot::unlisted(entry.name, entry.path);
                    match self.identity.directory_identity(&dir, self) {
                        Ok(identity) => dir.identity = identity,
                        Err(e) => {
                            self.skip(&mut listing, dir.name, e);
                            continue;
                        }
                    }
                    if let Some(previous) = listing.directories.insert(dir.identity.clone(), dir) {
                        warn!(path = %previous.path.display(), "Duplicate directory identity, entry ignored");
                    }
                }
                None => {}
            }
        }

        Ok(listing)
    }

    fn skip(&self, listing: &mut Listing, name: String, error: StorageError) {
        warn!(path = %error.path().display(), error = %error, "Entry skipped for this pass");
        listing.skipped.insert(name);
        // The unreadable entries below an incomplete subtree were already held back.
        if !matches!(error, StorageError::IncompleteListing(_)) {
            self.unreported.borrow_mut().push(error);
        }
    }
}
