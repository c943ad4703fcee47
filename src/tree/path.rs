//! Source-to-replica path mapping

use crate::error::StorageError;
use std::path::{Path, PathBuf};

/// Maps paths under the source root onto the replica root
#[derive(Debug, Clone)]
pub struct PathMirror {
    source_root: PathBuf,
    replica_root: PathBuf,
}

impl PathMirror {
    pub fn new(source_root: impl Into<PathBuf>, replica_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn replica_root(&self) -> &Path {
        &self.replica_root
    }

    /// Replica counterpart of a source path: `replica_root + relative(source_root, path)`
    ///
    /// Paths outside the source root are rejected instead of mapped, which keeps the
    /// mapping injective.
    pub fn to_replica(&self, source_path: &Path) -> Result<PathBuf, StorageError> {
        let relative =
            source_path
                .strip_prefix(&self.source_root)
                .map_err(|_| StorageError::OutsideRoot {
                    path: source_path.to_path_buf(),
                    root: self.source_root.clone(),
                })?;
        if relative.as_os_str().is_empty() {
            return Ok(self.replica_root.clone());
        }
        Ok(self.replica_root.join(relative))
    }

    /// True when one root contains the other, which would let mutations reach the source
    pub fn roots_overlap(&self) -> bool {
        self.source_root.starts_with(&self.replica_root)
            || self.replica_root.starts_with(&self.source_root)
    }
}
