//! Error types
//!
//! `StorageError` covers everything the filesystem adapter and the snapshot builder can
//! report for a single item. `SyncError` is what construction, configuration and a whole
//! pass can fail with.

use std::path::PathBuf;

/// Errors raised by filesystem access for a single entity
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path {path} is not under root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Directory {0} has entries that could not be read")]
    IncompleteListing(PathBuf),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Path the failure is attached to
    pub fn path(&self) -> &std::path::Path {
        match self {
            StorageError::Io { path, .. } => path,
            StorageError::OutsideRoot { path, .. } => path,
            StorageError::IncompleteListing(path) => path,
        }
    }
}

/// Errors that stop the engine from being built or a pass from running
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Source directory '{0}' not found or not a directory")]
    SourceMissing(PathBuf),

    #[error("Replica directory '{0}' not found or not a directory")]
    ReplicaMissing(PathBuf),

    #[error("Source {source_root} and replica {replica_root} overlap")]
    OverlappingRoots {
        source_root: PathBuf,
        replica_root: PathBuf,
    },

    #[error("Pass panicked: {0}")]
    PassPanicked(String),

    #[error("A reconciliation pass is already running")]
    PassInFlight,

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::ConfigError(err.to_string())
    }
}
