//! Stored-file naming.
//!
//! Every file accepted by filedrop is written under a freshly generated name so that nothing
//! derived from the uploader's filename (beyond its extension) ever reaches the filesystem.
//!
//! ## Format
//! `<uuid>_<timestamp>.<extension>`
//!
//! - `uuid`: random RFC 4122 version 4 UUID, lowercase and hyphenated
//! - `timestamp`: UTC time of generation as `yyyyMMddHHmmss` (14 digits, seconds precision)
//! - `extension`: the validated extension of the upload, lowercase
//!
//! Example:
//! `550e8400-e29b-41d4-a716-446655440000_20260111143522.png`
//!
//! The UUID component makes collisions practically impossible; the timestamp keeps directory
//! listings roughly human-orderable.

mod service;

pub use service::{StoredName, Uuid, TIMESTAMP_FORMAT};

/// Error type for stored-name operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for stored-name operations.
pub type UuidResult<T> = Result<T, UuidError>;
