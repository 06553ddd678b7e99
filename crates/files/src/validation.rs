//! Upload policy checks.
//!
//! Applied in a fixed order by [`validate_upload`]; the first failing check decides the error.

use crate::constants::{ALLOWED_EXTENSIONS, ALLOWED_MIME_TYPES, MAX_FILE_SIZE};
use crate::{FilesError, FilesResult};

/// Runs the full upload policy and returns the lowercase extension to store under.
///
/// # Errors
///
/// - [`FilesError::PayloadTooLarge`] if `size` exceeds [`MAX_FILE_SIZE`]
/// - [`FilesError::InvalidPath`] if the cleaned name still contains a `..` segment
/// - [`FilesError::UnsupportedType`] if the extension or content type is not allowed
pub(crate) fn validate_upload(
    original_name: &str,
    size: u64,
    content_type: Option<&str>,
) -> FilesResult<String> {
    check_size(size)?;

    let cleaned = clean_path(original_name);
    if has_traversal_segment(&cleaned) {
        return Err(FilesError::InvalidPath(format!(
            "Invalid path sequence in filename: {}",
            cleaned
        )));
    }

    let extension = check_extension(file_extension(&cleaned))?;
    check_content_type(content_type)?;

    Ok(extension)
}

pub(crate) fn check_size(size: u64) -> FilesResult<()> {
    if size > MAX_FILE_SIZE {
        return Err(FilesError::PayloadTooLarge(format!(
            "File size {} bytes exceeds limit of 5 MiB ({} bytes)",
            size, MAX_FILE_SIZE
        )));
    }
    Ok(())
}

/// Normalises a client-supplied filename.
///
/// Backslashes become `/`, empty and `.` segments are dropped, and each `..` cancels the
/// segment before it. A `..` with nothing left to cancel is kept, so traversal attempts survive
/// cleaning and can be detected afterwards.
pub(crate) fn clean_path(name: &str) -> String {
    let unified = name.replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    let mut unresolved_parents = 0usize;

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    unresolved_parents += 1;
                }
            }
            other => segments.push(other),
        }
    }

    let mut parts: Vec<&str> = std::iter::repeat("..").take(unresolved_parents).collect();
    parts.extend(segments);

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

pub(crate) fn has_traversal_segment(cleaned: &str) -> bool {
    cleaned.split('/').any(|segment| segment == "..")
}

/// Substring after the last `.`, or the empty string when there is none.
pub(crate) fn file_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) => &name[index + 1..],
        None => "",
    }
}

fn check_extension(extension: &str) -> FilesResult<String> {
    let lowered = extension.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&lowered.as_str()) {
        return Err(FilesError::UnsupportedType(format!(
            "File type '{}' not allowed",
            extension
        )));
    }
    Ok(lowered)
}

fn check_content_type(content_type: Option<&str>) -> FilesResult<()> {
    match content_type {
        Some(mime) if ALLOWED_MIME_TYPES.contains(&mime) => Ok(()),
        Some(mime) => Err(FilesError::UnsupportedType(format!(
            "MIME type '{}' not allowed",
            mime
        ))),
        None => Err(FilesError::UnsupportedType(
            "MIME type missing; a declared content type is required".into(),
        )),
    }
}
