//! Filedrop File Storage
//!
//! This crate provides the storage engine behind filedrop: a single flat directory of uploaded
//! files, each written under a generated name after passing a size and type policy.
//!
//! ## Design Principles
//!
//! - One storage root per [`FilesService`], fixed at construction and never global
//! - Nothing from the uploader's filename reaches the filesystem except its validated extension
//! - Every caller-supplied name is resolved and checked to lie strictly inside the root
//! - Files appear under their final name atomically (temporary file + rename)
//! - The directory listing is the catalog; no sidecar metadata or index is kept
//!
//! ## Storage Layout
//!
//! ```text
//! <storage_root>/
//! ├── 550e8400-e29b-41d4-a716-446655440000_20260111143522.png
//! ├── 7c9e6679-7425-40de-944b-e07fc1f90ae7_20260111150102.pdf
//! └── .upload-XXXXXX      # in-flight upload, never listed
//! ```
//!
//! ## Upload Policy
//!
//! Checked in order, first failure wins:
//!
//! 1. declared size at most [`MAX_FILE_SIZE`]
//! 2. cleaned original name free of `..` segments
//! 3. extension in [`ALLOWED_EXTENSIONS`] (case-insensitive)
//! 4. declared content type in [`ALLOWED_MIME_TYPES`] (exact match)
//!
//! ## Example Usage
//!
//! ```no_run
//! use filedrop_files::{FilesService, IncomingFile};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = FilesService::initialise(Path::new("./uploads"))?;
//!
//! let upload = IncomingFile::from_bytes(
//!     b"%PDF-1.7".to_vec(),
//!     "report.pdf",
//!     Some("application/pdf".to_owned()),
//! );
//! let stored = service.store(upload)?;
//!
//! for file in service.list()? {
//!     println!("{} ({} bytes)", file.filename, file.size);
//! }
//!
//! service.delete(&stored.to_string())?;
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;
mod paths;
mod validation;

pub use constants::{
    ALLOWED_EXTENSIONS, ALLOWED_MIME_TYPES, FALLBACK_CONTENT_TYPE, MAX_FILE_SIZE,
    TEMP_FILE_PREFIX,
};
pub use files::{FilesService, IncomingFile, ResolvedFile, StoredFile};
pub use filedrop_uuid::StoredName;

/// Errors that can occur during file operations
///
/// Every variant carries a human-readable message. Adapters map variants to their own status
/// codes; [`FilesError::kind`] gives a stable identifier for each.
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Upload exceeds the size limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Path validation failed (directory traversal or a name outside the storage root)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Extension or declared content type is not on the allow-list
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// No stored file under the requested name
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    StorageIo(#[from] std::io::Error),
}

impl FilesError {
    /// Stable snake_case identifier of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FilesError::PayloadTooLarge(_) => "payload_too_large",
            FilesError::InvalidPath(_) => "invalid_path",
            FilesError::UnsupportedType(_) => "unsupported_type",
            FilesError::NotFound(_) => "not_found",
            FilesError::StorageIo(_) => "storage_io",
        }
    }

    /// Returns true for faults caused by the caller's input rather than the environment.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, FilesError::StorageIo(_))
    }
}

/// Result type for file operations.
pub type FilesResult<T> = Result<T, FilesError>;
