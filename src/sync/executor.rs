//! Mutation executor
//!
//! The only place replica contents are changed. Every operation reports through the
//! event sink and never propagates a per-item failure: the failure is recorded and
//! the caller moves on to the next entity.

use super::events::{EventRecord, EventSink, Operation, SyncEvent};
use crate::error::StorageError;
use crate::fs::FileSystem;
use crate::tree::{DirectorySnapshot, FileSnapshot, SnapshotBuilder};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Tally of what one pass did to the replica
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub directories_created: usize,
    pub files_created: usize,
    pub files_updated: usize,
    pub files_renamed: usize,
    pub directories_renamed: usize,
    pub files_deleted: usize,
    pub directories_deleted: usize,
    pub failures: usize,
    pub duration_ms: u64,
}

impl PassReport {
    /// Total number of successful replica mutations
    pub fn mutations(&self) -> usize {
        self.directories_created
            + self.files_created
            + self.files_updated
            + self.files_renamed
            + self.directories_renamed
            + self.files_deleted
            + self.directories_deleted
    }

    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

pub struct MutationExecutor {
    fs: Arc<dyn FileSystem>,
    sink: Arc<dyn EventSink>,
    report: PassReport,
}

impl MutationExecutor {
    pub fn new(fs: Arc<dyn FileSystem>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            fs,
            sink,
            report: PassReport::default(),
        }
    }

    pub fn report(&self) -> &PassReport {
        &self.report
    }

    pub fn into_report(self) -> PassReport {
        self.report
    }

    /// Create the replica counterpart of `source` at `path`
    pub fn create_directory(&mut self, source: &DirectorySnapshot, path: &Path) -> bool {
        match self.fs.create_dir(path) {
            Ok(()) => {
                self.report.directories_created += 1;
                self.emit(SyncEvent::DirectoryCreated {
                    identity: source.identity().to_string(),
                    path: path.to_path_buf(),
                });
                true
            }
            Err(e) => {
                self.record_failure(Operation::CreateDirectory, e);
                false
            }
        }
    }

    /// Copy a source file to `to`, which must not exist yet
    pub fn copy_file(&mut self, source: &FileSnapshot, to: &Path) -> bool {
        match self.fs.copy_file(source.path(), to) {
            Ok(()) => {
                self.report.files_created += 1;
                self.emit(SyncEvent::FileCreated {
                    identity: source.identity().to_string(),
                    path: to.to_path_buf(),
                });
                true
            }
            Err(e) => {
                self.record_failure(Operation::CopyFile, e);
                false
            }
        }
    }

    /// Replace a stale replica file with the source's bytes
    ///
    /// Delete then copy, reported as a single update.
    pub fn update_file(&mut self, source: &FileSnapshot, replica: &FileSnapshot) -> bool {
        let result = self
            .fs
            .remove_file(replica.path())
            .and_then(|()| self.fs.copy_file(source.path(), replica.path()));
        match result {
            Ok(()) => {
                self.report.files_updated += 1;
                self.emit(SyncEvent::FileUpdated {
                    identity: source.identity().to_string(),
                    path: replica.path().to_path_buf(),
                });
                true
            }
            Err(e) => {
                self.record_failure(Operation::UpdateFile, e);
                false
            }
        }
    }

    pub fn delete_file(&mut self, replica: &FileSnapshot) -> bool {
        match self.fs.remove_file(replica.path()) {
            Ok(()) => {
                self.report.files_deleted += 1;
                self.emit(SyncEvent::FileDeleted {
                    identity: replica.identity().to_string(),
                    path: replica.path().to_path_buf(),
                });
                true
            }
            Err(e) => {
                self.record_failure(Operation::DeleteFile, e);
                false
            }
        }
    }

    /// Move a replica file whose content equals `source` to `to`
    ///
    /// The moved file takes the source modification time, so the modified-time
    /// strategy does not flag it on the next pass.
    pub fn move_file(&mut self, replica: &FileSnapshot, source: &FileSnapshot, to: &Path) -> bool {
        if let Err(e) = self.fs.rename_file(replica.path(), to) {
            self.record_failure(Operation::MoveFile, e);
            return false;
        }
        self.report.files_renamed += 1;
        self.emit(SyncEvent::FileRenamed {
            identity: source.identity().to_string(),
            from: replica.path().to_path_buf(),
            to: to.to_path_buf(),
        });
        if let Err(e) = self.fs.set_modified(to, source.modified()) {
            self.record_failure(Operation::MoveFile, e);
        }
        true
    }

    pub fn move_directory(&mut self, replica: &DirectorySnapshot, to: &Path) -> bool {
        match self.fs.rename_dir(replica.path(), to) {
            Ok(()) => {
                self.report.directories_renamed += 1;
                self.emit(SyncEvent::DirectoryRenamed {
                    identity: replica.identity().to_string(),
                    from: replica.path().to_path_buf(),
                    to: to.to_path_buf(),
                });
                true
            }
            Err(e) => {
                self.record_failure(Operation::MoveDirectory, e);
                false
            }
        }
    }

    /// Remove a replica directory and everything below it
    ///
    /// Depth-first: subdirectories, then files, then the directory itself. A failure
    /// inside the subtree, or an entry that could not be listed, leaves the directory
    /// in place for the next pass.
    pub fn delete_directory_tree(&mut self, replica: &DirectorySnapshot, tree: &SnapshotBuilder) -> bool {
        self.emit(SyncEvent::DirectoryDeleteStarted {
            identity: replica.identity().to_string(),
            path: replica.path().to_path_buf(),
        });

        let listing = match tree.listing(replica) {
            Ok(listing) => listing,
            Err(e) => {
                self.record_failure(Operation::Scan, e);
                return false;
            }
        };

        let mut complete = true;
        for child in listing.directories.values() {
            complete &= self.delete_directory_tree(child, tree);
        }
        for file in listing.files.values() {
            complete &= self.delete_file(file);
        }
        if !complete || !listing.is_complete() {
            return false;
        }

        match self.fs.remove_dir(replica.path()) {
            Ok(()) => {
                self.report.directories_deleted += 1;
                self.emit(SyncEvent::DirectoryDeleted {
                    identity: replica.identity().to_string(),
                    path: replica.path().to_path_buf(),
                });
                true
            }
            Err(e) => {
                self.record_failure(Operation::DeleteDirectory, e);
                false
            }
        }
    }

    /// Count a per-item failure and report it with its full cause chain
    pub fn record_failure(&mut self, operation: Operation, error: StorageError) {
        self.report.failures += 1;
        let path = error.path().to_path_buf();
        let message = error.to_string();
        let trace = format!("{:?}", anyhow::Error::new(error));
        self.emit(SyncEvent::Failure {
            operation,
            path,
            message,
            trace,
        });
    }

    fn emit(&self, event: SyncEvent) {
        self.sink.record(&EventRecord::now(event));
    }
}
