//! Resolution of caller-supplied names against the storage root.

use crate::{FilesError, FilesResult};
use std::path::{Component, Path, PathBuf};

/// Joins `filename` onto `root`, normalises the result lexically and checks it stays inside.
///
/// `root` must be absolute and normalised. The returned path is strictly below `root`; it may
/// not exist.
///
/// # Errors
///
/// Returns [`FilesError::InvalidPath`] if the name is empty, contains a NUL byte, is absolute,
/// or normalises to the root itself or anywhere outside it.
pub(crate) fn resolve_within(root: &Path, filename: &str) -> FilesResult<PathBuf> {
    if filename.is_empty() || filename.contains('\0') {
        return Err(FilesError::InvalidPath(format!(
            "Invalid filename: {:?}",
            filename
        )));
    }

    let resolved = normalise(&root.join(filename));

    if !is_strictly_within(root, &resolved) {
        return Err(FilesError::InvalidPath(format!(
            "Filename resolves outside the storage directory: {}",
            filename
        )));
    }

    Ok(resolved)
}

/// True if `path` lies below `root` and is not `root` itself.
pub(crate) fn is_strictly_within(root: &Path, path: &Path) -> bool {
    path.starts_with(root) && path != root
}

/// Lexical normalisation: drops `.` components and folds each `..` into its parent.
///
/// Does not touch the filesystem, so symlinks are not resolved.
fn normalise(path: &Path) -> PathBuf {
    let mut normalised = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalised.pop();
            }
            other => normalised.push(other.as_os_str()),
        }
    }
    normalised
}
