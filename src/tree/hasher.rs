//! Fingerprint computation for files and directories

use crate::types::Fingerprint;
use std::io::Read;

const FILE_TAG: &[u8] = b"f";
const DIRECTORY_TAG: &[u8] = b"d";

/// Fingerprint an arbitrary byte stream
pub fn fingerprint_reader(mut reader: impl Read) -> std::io::Result<Fingerprint> {
    let mut hasher = blake3::Hasher::new();
    hasher.update_reader(&mut reader)?;
    Ok(*hasher.finalize().as_bytes())
}

/// Fingerprint an in-memory buffer
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    *blake3::hash(bytes).as_bytes()
}

/// Compute the aggregate fingerprint of a directory from its children
///
/// Files come first, then subdirectories; each group is sorted by name so the
/// result does not depend on the order the filesystem enumerated them in. Names
/// are length-prefixed so two different child lists never feed the same bytes.
pub fn compute_directory_fingerprint<'a>(
    files: impl IntoIterator<Item = (&'a str, Fingerprint)>,
    directories: impl IntoIterator<Item = (&'a str, Fingerprint)>,
) -> Fingerprint {
    let mut files: Vec<_> = files.into_iter().collect();
    let mut directories: Vec<_> = directories.into_iter().collect();
    files.sort_by(|a, b| a.0.cmp(b.0));
    directories.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = blake3::Hasher::new();
    for (tag, group) in [(FILE_TAG, &files), (DIRECTORY_TAG, &directories)] {
        for (name, fingerprint) in group {
            hasher.update(tag);
            hasher.update(fingerprint);
            hasher.update(&(name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
        }
    }
    *hasher.finalize().as_bytes()
}
