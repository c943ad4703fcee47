//! Periodic pass scheduling
//!
//! Runs a pass immediately on start and then once per period. Passes themselves are
//! blocking filesystem walks, so each tick hands [`SyncEngine::trigger`] to tokio's
//! blocking pool; the engine's guard decides what happens when ticks overlap.

use crate::error::SyncError;
use crate::sync::{SyncEngine, TriggerOutcome};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

pub struct Scheduler {
    engine: Arc<SyncEngine>,
    period: Duration,
    /// Running state
    running: Arc<RwLock<bool>>,
    /// Wakes the ticker so it notices a stop before the next tick
    shutdown: Arc<Notify>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(engine: Arc<SyncEngine>, period: Duration) -> Self {
        Self {
            engine,
            period,
            running: Arc::new(RwLock::new(false)),
            shutdown: Arc::new(Notify::new()),
            ticker: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    /// Start ticking; must be called from within a tokio runtime
    pub fn start(&self) -> Result<(), SyncError> {
        if self.period.is_zero() {
            return Err(SyncError::ConfigError(
                "Synchronization period must be positive".to_string(),
            ));
        }
        let mut running = self.running.write();
        if *running {
            return Ok(()); // Already running
        }
        *running = true;
        drop(running);

        info!(
            source = %self.engine.source_root().display(),
            replica = %self.engine.replica_root().display(),
            period_secs = self.period.as_secs_f64(),
            identity = %self.engine.identity_kind(),
            change_detection = %self.engine.change_kind(),
            overlap = %self.engine.overlap_policy(),
            "Synchronization started"
        );

        let handle = tokio::spawn(Self::tick_loop(
            Arc::clone(&self.engine),
            self.period,
            Arc::clone(&self.running),
            Arc::clone(&self.shutdown),
        ));
        *self.ticker.lock() = Some(handle);
        Ok(())
    }

    /// Stop triggering and wait for passes already in flight
    pub async fn stop(&self) {
        let mut running = self.running.write();
        if !*running {
            return; // Already stopped
        }
        *running = false;
        drop(running);

        self.shutdown.notify_one();
        let ticker = self.ticker.lock().take();
        if let Some(handle) = ticker {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler task failed");
            }
        }

        info!(
            source = %self.engine.source_root().display(),
            replica = %self.engine.replica_root().display(),
            "Synchronization stopped"
        );
    }

    async fn tick_loop(
        engine: Arc<SyncEngine>,
        period: Duration,
        running: Arc<RwLock<bool>>,
        shutdown: Arc<Notify>,
    ) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passes = JoinSet::new();

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.notified() => {}
            }
            if !*running.read() {
                break;
            }

            let engine = Arc::clone(&engine);
            passes.spawn_blocking(move || engine.trigger());

            while let Some(finished) = passes.try_join_next() {
                Self::log_finished(finished);
            }
        }

        debug!(in_flight = passes.len(), "Waiting for in-flight passes");
        while let Some(finished) = passes.join_next().await {
            Self::log_finished(finished);
        }
    }

    fn log_finished(finished: Result<TriggerOutcome, tokio::task::JoinError>) {
        match finished {
            Ok(TriggerOutcome::Ran(Ok(report))) => {
                debug!(mutations = report.mutations(), failures = report.failures, "Pass completed");
            }
            // Pass errors were already logged by the engine.
            Ok(_) => {}
            Err(e) => error!(error = %e, "Pass task failed"),
        }
    }
}
