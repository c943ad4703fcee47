//! Pluggable identity and change-detection behavior
//!
//! Two small capability sets, each with two implementations selected from
//! configuration when the engine is built:
//!
//! - [`IdentityStrategy`]: how an entity is matched between source and replica
//! - [`ChangeStrategy`]: whether a matched file has to be rewritten

pub mod change;
pub mod identity;

pub use change::{ContentHashStrategy, ModifiedTimeStrategy};
pub use identity::{ContentIdentityStrategy, NameIdentityStrategy};

use crate::error::StorageError;
use crate::tree::builder::SnapshotBuilder;
use crate::tree::node::{DirectorySnapshot, FileSnapshot};
use crate::types::Identity;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Assigns the key used to pair up siblings across source and replica
///
/// Implementations only read through `tree`, which caches every fingerprint it computes.
pub trait IdentityStrategy: Send + Sync {
    fn file_identity(
        &self,
        file: &FileSnapshot,
        tree: &SnapshotBuilder,
    ) -> Result<Identity, StorageError>;

    fn directory_identity(
        &self,
        dir: &DirectorySnapshot,
        tree: &SnapshotBuilder,
    ) -> Result<Identity, StorageError>;

    fn description(&self) -> &'static str;
}

/// Decides whether a matched replica file is stale
pub trait ChangeStrategy: Send + Sync {
    fn has_changed(
        &self,
        source: &FileSnapshot,
        replica: &FileSnapshot,
        tree: &SnapshotBuilder,
    ) -> Result<bool, StorageError>;

    /// Directory pairs are compared by aggregate fingerprint regardless of the file strategy.
    fn directory_changed(
        &self,
        source: &DirectorySnapshot,
        replica: &DirectorySnapshot,
        tree: &SnapshotBuilder,
    ) -> Result<bool, StorageError> {
        Ok(tree.directory_fingerprint(source)? != tree.directory_fingerprint(replica)?)
    }

    fn description(&self) -> &'static str;
}

/// Identity strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityKind {
    /// Identity is the entry name
    #[default]
    Name,
    /// Identity is the content fingerprint plus the entry name
    Content,
}

impl IdentityKind {
    pub fn build(self) -> Arc<dyn IdentityStrategy> {
        match self {
            IdentityKind::Name => Arc::new(NameIdentityStrategy),
            IdentityKind::Content => Arc::new(ContentIdentityStrategy),
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKind::Name => write!(f, "name"),
            IdentityKind::Content => write!(f, "content"),
        }
    }
}

/// Change detection selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    /// Compare last-modified timestamps
    #[serde(alias = "modifiedtime")]
    #[value(alias = "modifiedtime")]
    ModifiedTime,
    /// Compare content fingerprints
    #[default]
    #[serde(alias = "modifiedhash")]
    #[value(alias = "modifiedhash")]
    ContentHash,
}

impl ChangeKind {
    pub fn build(self) -> Arc<dyn ChangeStrategy> {
        match self {
            ChangeKind::ModifiedTime => Arc::new(ModifiedTimeStrategy),
            ChangeKind::ContentHash => Arc::new(ContentHashStrategy),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::ModifiedTime => write!(f, "modified-time"),
            ChangeKind::ContentHash => write!(f, "content-hash"),
        }
    }
}
