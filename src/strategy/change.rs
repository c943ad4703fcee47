//! Change detection strategies

use super::ChangeStrategy;
use crate::error::StorageError;
use crate::tree::builder::SnapshotBuilder;
use crate::tree::node::FileSnapshot;

/// Changed when the content fingerprints differ
///
/// Authoritative, but reads both files in full the first time they are compared.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentHashStrategy;

impl ChangeStrategy for ContentHashStrategy {
    fn has_changed(
        &self,
        source: &FileSnapshot,
        replica: &FileSnapshot,
        tree: &SnapshotBuilder,
    ) -> Result<bool, StorageError> {
        Ok(tree.file_fingerprint(source)? != tree.file_fingerprint(replica)?)
    }

    fn description(&self) -> &'static str {
        "BLAKE3 file content hashing"
    }
}

/// Changed when the last-modified timestamps differ
///
/// Misses edits that keep the timestamp and flags copies that only touched metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModifiedTimeStrategy;

impl ChangeStrategy for ModifiedTimeStrategy {
    fn has_changed(
        &self,
        source: &FileSnapshot,
        replica: &FileSnapshot,
        _tree: &SnapshotBuilder,
    ) -> Result<bool, StorageError> {
        Ok(source.modified() != replica.modified())
    }

    fn description(&self) -> &'static str {
        "Last file modification time"
    }
}
