//! Storage policy constants.

/// Largest accepted upload, in bytes (5 MiB).
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Accepted file extensions, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "pdf"];

/// Accepted declared content types, compared exactly.
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/png", "image/jpg", "image/jpeg", "application/pdf"];

/// Content type reported when neither sniffing nor the extension identifies a file.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Prefix of in-flight upload files inside the storage root. Listing skips these.
pub const TEMP_FILE_PREFIX: &str = ".upload-";

/// Access mode given to stored files.
#[cfg(unix)]
pub(crate) const STORED_FILE_MODE: u32 = 0o644;

/// Number of leading bytes read when sniffing a stored file's content type.
pub(crate) const SNIFF_LEN: u64 = 8192;
