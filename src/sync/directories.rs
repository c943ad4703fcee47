//! Directory reconciliation and recursion

use super::events::Operation;
use super::files::reconcile_files;
use super::Pass;
use crate::error::StorageError;
use crate::tree::DirectorySnapshot;
use std::path::PathBuf;
use tracing::debug;

/// Where a source subdirectory lives in the replica once the level is reconciled
enum Counterpart<'r> {
    /// Replica child that was already there (its snapshot is still accurate)
    Existing(&'r DirectorySnapshot),
    /// Created or moved into place this pass; has to be scanned fresh
    Placed(PathBuf),
}

/// Reconcile one level and then every subdirectory below it
pub(crate) fn sync_level(
    pass: &mut Pass<'_>,
    source: &DirectorySnapshot,
    replica: &DirectorySnapshot,
) -> Result<(), StorageError> {
    let plan = reconcile_files(pass, source, replica)
        .and_then(|()| reconcile_directories(pass, source, replica));
    pass.flush_skipped();

    for (source_child, counterpart) in plan? {
        if let Err(e) = descend(pass, source_child, counterpart) {
            pass.executor.record_failure(Operation::Scan, e);
        }
    }
    Ok(())
}

fn descend(
    pass: &mut Pass<'_>,
    source: &DirectorySnapshot,
    counterpart: Counterpart<'_>,
) -> Result<(), StorageError> {
    match counterpart {
        Counterpart::Existing(replica) => {
            if pass.prune_unchanged {
                match pass.change.directory_changed(source, replica, pass.tree) {
                    Ok(false) => {
                        debug!(path = %replica.path().display(), "Subtree unchanged, not descending");
                        return Ok(());
                    }
                    Ok(true) => {}
                    // Unreadable entries are reported when their level is reconciled.
                    Err(e) => {
                        debug!(path = %replica.path().display(), error = %e, "Subtree not compared, descending");
                    }
                }
            }
            sync_level(pass, source, replica)
        }
        Counterpart::Placed(path) => {
            let replica = pass.tree.scan(&path)?;
            sync_level(pass, source, &replica)
        }
    }
}

/// Structural fixes for the direct subdirectories of `replica`
///
/// Returns the source subdirectories that still need a recursive visit, paired with
/// their replica counterpart. Unclaimed replica subdirectories are deleted before
/// this returns; those named like an unreadable source entry are left alone.
fn reconcile_directories<'s, 'r>(
    pass: &mut Pass<'_>,
    source: &'s DirectorySnapshot,
    replica: &'r DirectorySnapshot,
) -> Result<Vec<(&'s DirectorySnapshot, Counterpart<'r>)>, StorageError> {
    let source_listing = pass.tree.listing(source)?;
    let source_dirs = &source_listing.directories;
    let replica_dirs = &pass.tree.listing(replica)?.directories;

    let mut candidates: Vec<&'r DirectorySnapshot> = replica_dirs
        .iter()
        .filter(|(identity, _)| !source_dirs.contains_key(*identity))
        .map(|(_, dir)| dir)
        .filter(|dir| !source_listing.skipped.contains(dir.name()))
        .collect();
    let mut unreadable = Vec::new();
    let mut plan = Vec::with_capacity(source_dirs.len());

    for (identity, dir) in source_dirs {
        if let Some(existing) = replica_dirs.get(identity) {
            plan.push((dir, Counterpart::Existing(existing)));
            continue;
        }

        // Same name, different identity: keep the directory and fix its contents
        // when we descend into it.
        let same_name = take_named(&mut candidates, dir.name())
            .or_else(|| take_named(&mut unreadable, dir.name()));
        if let Some(existing) = same_name {
            plan.push((dir, Counterpart::Existing(existing)));
            continue;
        }

        let target = match pass.mirror.to_replica(dir.path()) {
            Ok(target) => target,
            Err(e) => {
                pass.executor.record_failure(Operation::CreateDirectory, e);
                continue;
            }
        };

        let placed = match find_same_tree(pass, dir, &mut candidates, &mut unreadable) {
            Some(renamed) => pass.executor.move_directory(renamed, &target),
            None => pass.executor.create_directory(dir, &target),
        };
        if placed {
            plan.push((dir, Counterpart::Placed(target)));
        }
    }

    for stale in candidates.into_iter().chain(unreadable) {
        pass.executor.delete_directory_tree(stale, pass.tree);
    }

    Ok(plan)
}

fn take_named<'r>(
    dirs: &mut Vec<&'r DirectorySnapshot>,
    name: &str,
) -> Option<&'r DirectorySnapshot> {
    let index = dirs.iter().position(|d| d.name() == name)?;
    Some(dirs.remove(index))
}

/// Take the first delete candidate whose whole subtree equals `dir`, in identity order
///
/// When `dir` itself cannot be fingerprinted there is no match and it gets created
/// instead. A candidate that cannot be fingerprinted is reported and moved to
/// `unreadable`.
fn find_same_tree<'r>(
    pass: &mut Pass<'_>,
    dir: &DirectorySnapshot,
    candidates: &mut Vec<&'r DirectorySnapshot>,
    unreadable: &mut Vec<&'r DirectorySnapshot>,
) -> Option<&'r DirectorySnapshot> {
    if candidates.is_empty() {
        return None;
    }
    let wanted = match pass.tree.directory_fingerprint(dir) {
        Ok(wanted) => wanted,
        Err(e) => {
            debug!(path = %dir.path().display(), error = %e, "Directory not fingerprinted, creating instead of moving");
            return None;
        }
    };

    let mut index = 0;
    while index < candidates.len() {
        match pass.tree.directory_fingerprint(candidates[index]) {
            Ok(found) if found == wanted => return Some(candidates.remove(index)),
            Ok(_) => index += 1,
            Err(e) => {
                pass.executor.record_failure(Operation::Fingerprint, e);
                unreadable.push(candidates.remove(index));
            }
        }
    }
    None
}
