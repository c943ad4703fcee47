//! Treemirror: one-way directory mirroring
//!
//! Keeps a replica directory tree identical to a source tree. Each reconciliation pass
//! rescans both sides, matches entries by identity, detects renames by content
//! fingerprint and applies the smallest set of creates, updates, renames and deletes
//! needed. The source is only ever read.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod scheduler;
pub mod strategy;
pub mod sync;
pub mod tooling;
pub mod tree;
pub mod types;

pub use config::MirrorConfig;
pub use error::{StorageError, SyncError};
pub use scheduler::Scheduler;
pub use sync::{PassReport, SyncEngine};
