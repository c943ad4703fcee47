//! Identity strategies

use super::IdentityStrategy;
use crate::error::StorageError;
use crate::tree::builder::SnapshotBuilder;
use crate::tree::node::{DirectorySnapshot, FileSnapshot};
use crate::types::Identity;

/// Identity is the entry name
///
/// Cheap, but a rename looks like a delete plus a create until content matching
/// in the reconcilers pairs the two up again.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameIdentityStrategy;

impl IdentityStrategy for NameIdentityStrategy {
    fn file_identity(
        &self,
        file: &FileSnapshot,
        _tree: &SnapshotBuilder,
    ) -> Result<Identity, StorageError> {
        Ok(file.name().to_string())
    }

    fn directory_identity(
        &self,
        dir: &DirectorySnapshot,
        _tree: &SnapshotBuilder,
    ) -> Result<Identity, StorageError> {
        Ok(dir.name().to_string())
    }

    fn description(&self) -> &'static str {
        "entry name"
    }
}

/// Identity is the hex fingerprint followed by the entry name
///
/// Any content edit changes the identity. Directory identities need the whole
/// subtree fingerprinted, so every directory under a scanned level gets listed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentIdentityStrategy;

impl IdentityStrategy for ContentIdentityStrategy {
    fn file_identity(
        &self,
        file: &FileSnapshot,
        tree: &SnapshotBuilder,
    ) -> Result<Identity, StorageError> {
        let fingerprint = tree.file_fingerprint(file)?;
        Ok(format!("{}:{}", hex::encode(fingerprint), file.name()))
    }

    fn directory_identity(
        &self,
        dir: &DirectorySnapshot,
        tree: &SnapshotBuilder,
    ) -> Result<Identity, StorageError> {
        let fingerprint = tree.directory_fingerprint(dir)?;
        Ok(format!("{}:{}", hex::encode(fingerprint), dir.name()))
    }

    fn description(&self) -> &'static str {
        "BLAKE3 content fingerprint and entry name"
    }
}
