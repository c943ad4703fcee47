//! File reconciliation for one directory level

use super::events::Operation;
use super::Pass;
use crate::error::StorageError;
use crate::tree::{DirectorySnapshot, FileSnapshot};
use tracing::debug;

/// Bring the direct file children of `replica` in line with those of `source`
///
/// Order matters: creates and renames first, then updates of matched pairs, then
/// deletion of whatever replica files nothing claimed. Replica files named like a
/// source entry that could not be read are left alone.
pub(crate) fn reconcile_files(
    pass: &mut Pass<'_>,
    source: &DirectorySnapshot,
    replica: &DirectorySnapshot,
) -> Result<(), StorageError> {
    let source_listing = pass.tree.listing(source)?;
    let source_files = &source_listing.files;
    let replica_files = &pass.tree.listing(replica)?.files;

    let mut candidates: Vec<&FileSnapshot> = replica_files
        .iter()
        .filter(|(identity, _)| !source_files.contains_key(*identity))
        .map(|(_, file)| file)
        .filter(|file| !source_listing.skipped.contains(file.name()))
        .collect();
    let mut unreadable = Vec::new();
    let mut matched = Vec::new();

    for (identity, file) in source_files {
        if let Some(existing) = replica_files.get(identity) {
            matched.push((file, existing));
            continue;
        }

        // Same name, different identity: the replica file is a stale version sitting
        // exactly where the copy has to go.
        let same_name = take_named(&mut candidates, file.name())
            .or_else(|| take_named(&mut unreadable, file.name()));
        if let Some(stale) = same_name {
            pass.executor.update_file(file, stale);
            continue;
        }

        let target = match pass.mirror.to_replica(file.path()) {
            Ok(target) => target,
            Err(e) => {
                pass.executor.record_failure(Operation::CopyFile, e);
                continue;
            }
        };

        match find_same_content(pass, file, &mut candidates, &mut unreadable) {
            Ok(Some(renamed)) => {
                pass.executor.move_file(renamed, file, &target);
            }
            Ok(None) => {
                pass.executor.copy_file(file, &target);
            }
            Err(e) => pass.executor.record_failure(Operation::Fingerprint, e),
        }
    }

    for (source_file, replica_file) in matched {
        let changed = if source_file.size() != replica_file.size() {
            true
        } else {
            match pass.change.has_changed(source_file, replica_file, pass.tree) {
                Ok(changed) => changed,
                Err(e) => {
                    pass.executor.record_failure(Operation::Fingerprint, e);
                    continue;
                }
            }
        };
        if changed {
            pass.executor.update_file(source_file, replica_file);
        } else {
            debug!(path = %replica_file.path().display(), "File unchanged");
        }
    }

    for stale in candidates.into_iter().chain(unreadable) {
        pass.executor.delete_file(stale);
    }

    Ok(())
}

fn take_named<'r>(files: &mut Vec<&'r FileSnapshot>, name: &str) -> Option<&'r FileSnapshot> {
    let index = files.iter().position(|f| f.name() == name)?;
    Some(files.remove(index))
}

/// Take the first delete candidate whose bytes equal `file`, in identity order
///
/// A candidate that cannot be hashed is reported once and moved to `unreadable`; it
/// is still deleted later but never matched.
fn find_same_content<'r>(
    pass: &mut Pass<'_>,
    file: &FileSnapshot,
    candidates: &mut Vec<&'r FileSnapshot>,
    unreadable: &mut Vec<&'r FileSnapshot>,
) -> Result<Option<&'r FileSnapshot>, StorageError> {
    let mut wanted = None;
    let mut index = 0;
    while index < candidates.len() {
        let candidate = candidates[index];
        if candidate.size() != file.size() {
            index += 1;
            continue;
        }
        let fingerprint = match wanted {
            Some(fingerprint) => fingerprint,
            None => *wanted.insert(pass.tree.file_fingerprint(file)?),
        };
        match pass.tree.file_fingerprint(candidate) {
            Ok(found) if found == fingerprint => return Ok(Some(candidates.remove(index))),
            Ok(_) => index += 1,
            Err(e) => {
                pass.executor.record_failure(Operation::Fingerprint, e);
                unreadable.push(candidates.remove(index));
            }
        }
    }
    Ok(None)
}
