//! Configuration
//!
//! [`MirrorConfig`] is assembled by [`ConfigLoader`] from built-in defaults, an optional
//! TOML file and `TREEMIRROR__*` environment variables. The CLI applies its own flags on
//! top and then calls [`MirrorConfig::validate`].

pub mod facade;
pub mod merge {
    pub mod service;
}
pub mod sources {
    pub mod environment;
    pub mod file;
}

pub use facade::ConfigLoader;

use crate::concurrency::OverlapPolicy;
use crate::error::SyncError;
use crate::logging::LoggingConfig;
use crate::strategy::{ChangeKind, IdentityKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Everything needed to build and schedule a [`crate::sync::SyncEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Directory that is mirrored; only ever read
    #[serde(default)]
    pub source: PathBuf,

    /// Directory made identical to `source`
    #[serde(default)]
    pub replica: PathBuf,

    /// Seconds between the start of consecutive passes
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,

    #[serde(default)]
    pub identity: IdentityKind,

    #[serde(default)]
    pub change_detection: ChangeKind,

    #[serde(default)]
    pub overlap: OverlapPolicy,

    /// Skip descending into directory pairs whose aggregate fingerprints match
    #[serde(default)]
    pub prune_unchanged: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_period_secs() -> u64 {
    60
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            replica: PathBuf::new(),
            period_secs: default_period_secs(),
            identity: IdentityKind::default(),
            change_detection: ChangeKind::default(),
            overlap: OverlapPolicy::default(),
            prune_unchanged: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl MirrorConfig {
    pub fn new(source: impl Into<PathBuf>, replica: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
            ..Self::default()
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// Static checks that need no filesystem access
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.source.as_os_str().is_empty() {
            return Err(SyncError::ConfigError(
                "Source directory is not set".to_string(),
            ));
        }
        if self.replica.as_os_str().is_empty() {
            return Err(SyncError::ConfigError(
                "Replica directory is not set".to_string(),
            ));
        }
        if self.period_secs == 0 {
            return Err(SyncError::ConfigError(
                "Synchronization period must be a positive number of seconds".to_string(),
            ));
        }
        Ok(())
    }
}
