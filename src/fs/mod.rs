//! Filesystem adapter
//!
//! Everything the engine does to a disk goes through [`FileSystem`], so the
//! reconcilers never touch `std::fs` directly. The local implementation lives in
//! [`local`].

pub mod local;

pub use local::LocalFileSystem;

use crate::error::StorageError;
use crate::types::EntityKind;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One entry of a directory listing
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    /// `None` for symlinks, sockets and other entries the mirror does not replicate
    pub kind: Option<EntityKind>,
    pub size: u64,
    pub modified: SystemTime,
}

/// Lossless string form of an entry name
///
/// UTF-8 names are kept as they are. Anything else becomes a NUL followed by the hex of its
/// raw bytes; no real file name contains a NUL, so distinct names never share a key.
pub fn entry_name(name: &OsStr) -> String {
    match name.to_str() {
        Some(name) => name.to_string(),
        None => format!("\0{}", hex::encode(name.as_encoded_bytes())),
    }
}

/// Primitive filesystem operations consumed by the snapshot builder and the mutation executor
pub trait FileSystem: Send + Sync {
    /// List the direct children of a directory
    ///
    /// The outer error means the directory itself could not be read. An entry that
    /// could not be inspected comes back as an inner error carrying its own path.
    fn list_dir(&self, path: &Path) -> Result<Vec<Result<DirEntry, StorageError>>, StorageError>;

    /// Open a file for streaming its full contents
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + '_>, StorageError>;

    fn is_dir(&self, path: &Path) -> bool;

    fn create_dir(&self, path: &Path) -> Result<(), StorageError>;

    /// Copy a file, overwriting the destination and keeping the source modification time
    fn copy_file(&self, from: &Path, to: &Path) -> Result<(), StorageError>;

    fn remove_file(&self, path: &Path) -> Result<(), StorageError>;

    /// Remove an empty directory
    fn remove_dir(&self, path: &Path) -> Result<(), StorageError>;

    fn rename_file(&self, from: &Path, to: &Path) -> Result<(), StorageError>;

    fn rename_dir(&self, from: &Path, to: &Path) -> Result<(), StorageError>;

    /// Overwrite a file's modification time
    fn set_modified(&self, path: &Path, at: SystemTime) -> Result<(), StorageError>;
}
