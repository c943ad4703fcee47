//! Reconciliation
//!
//! A pass walks source and replica together, one directory level at a time:
//! files first ([`files`]), then subdirectories ([`directories`]), then recursion.
//! All replica mutations go through the [`executor`], which reports to an
//! [`EventSink`] and keeps the [`PassReport`].

mod directories;
pub mod engine;
pub mod events;
pub mod executor;
mod files;

pub use engine::{SyncEngine, TriggerOutcome};
pub use events::{EventRecord, EventSink, MemorySink, Operation, SyncEvent, TracingSink};
pub use executor::{MutationExecutor, PassReport};

use crate::strategy::ChangeStrategy;
use crate::tree::{PathMirror, SnapshotBuilder};

/// State shared by the reconcilers for the duration of one pass
pub(crate) struct Pass<'a> {
    pub tree: &'a SnapshotBuilder,
    pub mirror: &'a PathMirror,
    pub change: &'a dyn ChangeStrategy,
    pub executor: MutationExecutor,
    pub prune_unchanged: bool,
}

impl Pass<'_> {
    /// Report entries the snapshot builder had to leave out since the last flush
    pub fn flush_skipped(&mut self) {
        for error in self.tree.take_skipped() {
            self.executor.record_failure(Operation::Scan, error);
        }
    }
}
