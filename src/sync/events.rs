//! Mutation events and the sinks that receive them.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info};

/// Operation a failure event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Scan,
    Fingerprint,
    CreateDirectory,
    CopyFile,
    UpdateFile,
    DeleteFile,
    DeleteDirectory,
    MoveFile,
    MoveDirectory,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Scan => "scan",
            Operation::Fingerprint => "fingerprint",
            Operation::CreateDirectory => "create_directory",
            Operation::CopyFile => "copy_file",
            Operation::UpdateFile => "update_file",
            Operation::DeleteFile => "delete_file",
            Operation::DeleteDirectory => "delete_directory",
            Operation::MoveFile => "move_file",
            Operation::MoveDirectory => "move_directory",
        };
        f.write_str(name)
    }
}

/// Something the mutation executor did (or failed to do) to the replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    DirectoryCreated {
        identity: String,
        path: PathBuf,
    },
    FileCreated {
        identity: String,
        path: PathBuf,
    },
    FileUpdated {
        identity: String,
        path: PathBuf,
    },
    FileDeleted {
        identity: String,
        path: PathBuf,
    },
    FileRenamed {
        identity: String,
        from: PathBuf,
        to: PathBuf,
    },
    DirectoryRenamed {
        identity: String,
        from: PathBuf,
        to: PathBuf,
    },
    DirectoryDeleteStarted {
        identity: String,
        path: PathBuf,
    },
    DirectoryDeleted {
        identity: String,
        path: PathBuf,
    },
    Failure {
        operation: Operation,
        path: PathBuf,
        message: String,
        trace: String,
    },
}

impl SyncEvent {
    /// Stable snake_case name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::DirectoryCreated { .. } => "directory_created",
            SyncEvent::FileCreated { .. } => "file_created",
            SyncEvent::FileUpdated { .. } => "file_updated",
            SyncEvent::FileDeleted { .. } => "file_deleted",
            SyncEvent::FileRenamed { .. } => "file_renamed",
            SyncEvent::DirectoryRenamed { .. } => "directory_renamed",
            SyncEvent::DirectoryDeleteStarted { .. } => "directory_delete_started",
            SyncEvent::DirectoryDeleted { .. } => "directory_deleted",
            SyncEvent::Failure { .. } => "failure",
        }
    }
}

/// Timestamped event as handed to a sink
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub event: SyncEvent,
}

impl EventRecord {
    pub fn now(event: SyncEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Destination for mutation events
pub trait EventSink: Send + Sync {
    fn record(&self, record: &EventRecord);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, record: &EventRecord) {
        let at = record.timestamp.to_rfc3339();
        match &record.event {
            SyncEvent::DirectoryCreated { identity, path } => {
                info!(kind = "directory_created", at = %at, identity = %identity, path = %path.display(), "Replicated directory from source");
            }
            SyncEvent::FileCreated { identity, path } => {
                info!(kind = "file_created", at = %at, identity = %identity, path = %path.display(), "Replicated file from source");
            }
            SyncEvent::FileUpdated { identity, path } => {
                info!(kind = "file_updated", at = %at, identity = %identity, path = %path.display(), "Updated file in replica to match source");
            }
            SyncEvent::FileDeleted { identity, path } => {
                info!(kind = "file_deleted", at = %at, identity = %identity, path = %path.display(), "Deleted file no longer present in source");
            }
            SyncEvent::FileRenamed { identity, from, to } => {
                info!(kind = "file_renamed", at = %at, identity = %identity, from = %from.display(), to = %to.display(), "Renamed file, content matches");
            }
            SyncEvent::DirectoryRenamed { identity, from, to } => {
                info!(kind = "directory_renamed", at = %at, identity = %identity, from = %from.display(), to = %to.display(), "Renamed directory, content matches");
            }
            SyncEvent::DirectoryDeleteStarted { identity, path } => {
                info!(kind = "directory_delete_started", at = %at, identity = %identity, path = %path.display(), "Deleting directory");
            }
            SyncEvent::DirectoryDeleted { identity, path } => {
                info!(kind = "directory_deleted", at = %at, identity = %identity, path = %path.display(), "Fully deleted directory");
            }
            SyncEvent::Failure {
                operation,
                path,
                message,
                trace,
            } => {
                error!(kind = "failure", at = %at, operation = %operation, path = %path.display(), error = %message, trace = %trace, "Operation failed, item skipped for this pass");
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.records.lock().iter().map(|r| r.event.clone()).collect()
    }

    /// Number of recorded events of the given kind
    pub fn count(&self, kind: &str) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.event.kind() == kind)
            .count()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn record(&self, record: &EventRecord) {
        self.records.lock().push(record.clone());
    }
}
