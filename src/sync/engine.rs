//! Sync engine
//!
//! Owns the roots, the strategies and the single-flight guard. [`SyncEngine::run_once`]
//! runs one pass and reports its errors; [`SyncEngine::trigger`] is the entry point
//! for periodic callers and never lets a failure or panic escape.

use super::directories::sync_level;
use super::events::{EventSink, TracingSink};
use super::executor::{MutationExecutor, PassReport};
use super::Pass;
use crate::concurrency::{Admission, OverlapPolicy, PassGuard};
use crate::config::MirrorConfig;
use crate::error::SyncError;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::strategy::{ChangeKind, ChangeStrategy, IdentityKind, IdentityStrategy};
use crate::tree::{PathMirror, SnapshotBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// What a call to [`SyncEngine::trigger`] ended up doing
#[derive(Debug)]
pub enum TriggerOutcome {
    /// One or more passes ran; the result of the last one
    Ran(Result<PassReport, SyncError>),
    /// Another pass was in flight; a follow-up pass has been requested
    Queued,
    /// Another pass was in flight; the trigger was dropped
    Skipped,
}

pub struct SyncEngine {
    mirror: PathMirror,
    fs: Arc<dyn FileSystem>,
    identity: Arc<dyn IdentityStrategy>,
    change: Arc<dyn ChangeStrategy>,
    identity_kind: IdentityKind,
    change_kind: ChangeKind,
    sink: Arc<dyn EventSink>,
    guard: PassGuard,
    overlap: OverlapPolicy,
    prune_unchanged: bool,
}

impl SyncEngine {
    /// Engine over the local disk that logs its events through `tracing`
    pub fn new(config: &MirrorConfig) -> Result<Self, SyncError> {
        Self::with_collaborators(config, Arc::new(LocalFileSystem::new()), Arc::new(TracingSink))
    }

    /// Engine with an explicit filesystem adapter and event sink
    ///
    /// Fails when the configuration is invalid, when either root is missing or not a
    /// directory, or when one root contains the other.
    pub fn with_collaborators(
        config: &MirrorConfig,
        fs: Arc<dyn FileSystem>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, SyncError> {
        config.validate()?;

        if !fs.is_dir(&config.source) {
            return Err(SyncError::SourceMissing(config.source.clone()));
        }
        if !fs.is_dir(&config.replica) {
            return Err(SyncError::ReplicaMissing(config.replica.clone()));
        }
        let source_root = canonical(&config.source)?;
        let replica_root = canonical(&config.replica)?;

        let mirror = PathMirror::new(source_root, replica_root);
        if mirror.roots_overlap() {
            return Err(SyncError::OverlappingRoots {
                source_root: mirror.source_root().to_path_buf(),
                replica_root: mirror.replica_root().to_path_buf(),
            });
        }

        let identity = config.identity.build();
        let change = config.change_detection.build();
        debug!(
            identity = identity.description(),
            change = change.description(),
            "Strategies selected"
        );

        Ok(Self {
            mirror,
            fs,
            identity,
            change,
            identity_kind: config.identity,
            change_kind: config.change_detection,
            sink,
            guard: PassGuard::new(),
            overlap: config.overlap,
            prune_unchanged: config.prune_unchanged,
        })
    }

    pub fn source_root(&self) -> &Path {
        self.mirror.source_root()
    }

    pub fn replica_root(&self) -> &Path {
        self.mirror.replica_root()
    }

    pub fn identity_kind(&self) -> IdentityKind {
        self.identity_kind
    }

    pub fn change_kind(&self) -> ChangeKind {
        self.change_kind
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap
    }

    /// Whether a pass is currently in flight
    pub fn is_busy(&self) -> bool {
        self.guard.is_running()
    }

    /// Run one pass now, applying the overlap policy if one is already running
    ///
    /// Unlike [`trigger`](Self::trigger) this returns the pass error to the caller.
    pub fn run_once(&self) -> Result<PassReport, SyncError> {
        match self.trigger() {
            TriggerOutcome::Ran(result) => result,
            TriggerOutcome::Queued | TriggerOutcome::Skipped => Err(SyncError::PassInFlight),
        }
    }

    /// Ask for a pass
    ///
    /// Runs the pass on the calling thread when the engine is idle, then any re-run
    /// that was queued meanwhile. Errors and panics are logged here and never
    /// propagate; the guard is released on every path.
    pub fn trigger(&self) -> TriggerOutcome {
        let mut ticket = match self.guard.try_begin(self.overlap) {
            Admission::Started(ticket) => ticket,
            Admission::Queued => {
                info!("Pass already running, queued one more");
                return TriggerOutcome::Queued;
            }
            Admission::Rejected => {
                warn!("Pass already running, trigger skipped");
                return TriggerOutcome::Skipped;
            }
        };

        loop {
            let result = self.guarded_pass();
            if let Err(e) = &result {
                error!(error = %e, "Reconciliation pass aborted");
            }
            if !ticket.take_rerun() {
                return TriggerOutcome::Ran(result);
            }
            info!("Running queued pass");
        }
    }

    fn guarded_pass(&self) -> Result<PassReport, SyncError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.execute_pass())) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(SyncError::PassPanicked(message))
            }
        }
    }

    fn execute_pass(&self) -> Result<PassReport, SyncError> {
        let started = Instant::now();
        info!(
            source = %self.mirror.source_root().display(),
            replica = %self.mirror.replica_root().display(),
            "Reconciliation pass started"
        );

        let tree = SnapshotBuilder::new(self.fs.clone(), self.identity.clone());
        let source = tree.scan(self.mirror.source_root())?;
        let replica = tree.scan(self.mirror.replica_root())?;

        let mut pass = Pass {
            tree: &tree,
            mirror: &self.mirror,
            change: self.change.as_ref(),
            executor: MutationExecutor::new(self.fs.clone(), self.sink.clone()),
            prune_unchanged: self.prune_unchanged,
        };
        let result = sync_level(&mut pass, &source, &replica);
        pass.flush_skipped();
        result?;

        let mut report = pass.executor.into_report();
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            mutations = report.mutations(),
            failures = report.failures,
            duration_ms = report.duration_ms,
            "Reconciliation pass finished"
        );
        Ok(report)
    }
}

fn canonical(path: &Path) -> Result<std::path::PathBuf, SyncError> {
    dunce::canonicalize(path).map_err(|e| crate::error::StorageError::io(path, e).into())
}
