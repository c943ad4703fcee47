//! Tree snapshots
//!
//! In-memory view of one directory level (and, lazily, everything below it) for a
//! single reconciliation pass. Snapshots are never persisted or reused across passes.

pub mod builder;
pub mod hasher;
pub mod node;
pub mod path;

pub use builder::SnapshotBuilder;
pub use node::{DirectorySnapshot, FileSnapshot, Listing};
pub use path::PathMirror;
