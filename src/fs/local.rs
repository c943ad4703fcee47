//! Local disk implementation of the filesystem adapter.

use super::{entry_name, DirEntry, FileSystem};
use crate::error::StorageError;
use crate::types::EntityKind;
use filetime::FileTime;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// [`FileSystem`] backed by `std::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn list_dir(&self, path: &Path) -> Result<Vec<Result<DirEntry, StorageError>>, StorageError> {
        let mut entries = Vec::new();
        let walker = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // Depth 0 is the directory itself.
                Err(e) if e.depth() == 0 => return Err(walk_error(path, e)),
                Err(e) => {
                    entries.push(Err(walk_error(path, e)));
                    continue;
                }
            };

            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                Some(EntityKind::Directory)
            } else if file_type.is_file() {
                Some(EntityKind::File)
            } else {
                debug!(path = %entry.path().display(), "Skipping entry that is neither file nor directory");
                None
            };

            let stat = entry
                .metadata()
                .map_err(std::io::Error::from)
                .and_then(|metadata| Ok((metadata.len(), metadata.modified()?)));
            match stat {
                Ok((size, modified)) => entries.push(Ok(DirEntry {
                    name: entry_name(entry.file_name()),
                    path: entry.path().to_path_buf(),
                    kind,
                    size,
                    modified,
                })),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %entry.path().display(), "Entry vanished while listing");
                }
                Err(e) => entries.push(Err(StorageError::io(entry.path(), e))),
            }
        }

        Ok(entries)
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + '_>, StorageError> {
        let file = fs::File::open(path).map_err(|e| StorageError::io(path, e))?;
        Ok(Box::new(file))
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir(&self, path: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(path).map_err(|e| StorageError::io(path, e))
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        let modified = fs::metadata(from)
            .and_then(|m| m.modified())
            .map_err(|e| StorageError::io(from, e))?;

        fs::copy(from, to).map_err(|e| StorageError::io(to, e))?;

        // Keep mtimes aligned so the modified-time strategy sees the copy as unchanged.
        self.set_modified(to, modified)
    }

    fn remove_file(&self, path: &Path) -> Result<(), StorageError> {
        fs::remove_file(path).map_err(|e| StorageError::io(path, e))
    }

    fn remove_dir(&self, path: &Path) -> Result<(), StorageError> {
        fs::remove_dir(path).map_err(|e| StorageError::io(path, e))
    }

    fn rename_file(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        fs::rename(from, to).map_err(|e| StorageError::io(from, e))
    }

    fn rename_dir(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        fs::rename(from, to).map_err(|e| StorageError::io(from, e))
    }

    fn set_modified(&self, path: &Path, at: SystemTime) -> Result<(), StorageError> {
        filetime::set_file_mtime(path, FileTime::from_system_time(at))
            .map_err(|e| StorageError::io(path, e))
    }
}

fn walk_error(path: &Path, error: walkdir::Error) -> StorageError {
    let at = error.path().unwrap_or(path).to_path_buf();
    let source = error
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    StorageError::io(at, source)
}
