//! Internal implementation of stored-name generation and parsing.

use crate::{UuidError, UuidResult};
use chrono::{NaiveDateTime, Utc};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// `chrono` format string for the timestamp component (`yyyyMMddHHmmss`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const TIMESTAMP_LEN: usize = 14;
const HYPHENATED_UUID_LEN: usize = 36;

/// A generated name for a stored file.
///
/// Format: `<uuid>_<yyyyMMddHHmmss>.<extension>`
///
/// Example: `550e8400-e29b-41d4-a716-446655440000_20260111143522.pdf`
///
/// # Construction
/// - [`StoredName::generate`] allocates a fresh name for a new upload.
/// - [`StoredName::parse`] (or [`FromStr`]) validates an existing name, for example one read
///   back from a directory listing.
///
/// The extension is stored lowercase. It is not checked against any allow-list here; callers
/// decide which extensions are acceptable before generating a name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoredName {
    uuid: Uuid,
    timestamp: NaiveDateTime,
    extension: String,
}

impl StoredName {
    /// Generates a new stored name for the given extension, stamped with the current UTC time.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `extension` is empty or contains anything other
    /// than ASCII alphanumerics.
    pub fn generate(extension: &str) -> UuidResult<Self> {
        Self::generate_at(extension, Utc::now().naive_utc())
    }

    /// Generates a new stored name with an explicit timestamp.
    ///
    /// Sub-second precision in `timestamp` is discarded, matching the textual form.
    pub fn generate_at(extension: &str, timestamp: NaiveDateTime) -> UuidResult<Self> {
        let extension = validate_extension(extension)?;
        let timestamp = truncate_to_seconds(timestamp)?;

        Ok(Self {
            uuid: Uuid::new_v4(),
            timestamp,
            extension,
        })
    }

    /// Validates and parses a stored name.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` does not match
    /// `<hyphenated lowercase uuid>_<14 digits>.<alphanumeric extension>`.
    pub fn parse(input: &str) -> UuidResult<Self> {
        let invalid = |reason: &str| {
            UuidError::InvalidInput(format!("Invalid stored name '{}': {}", input, reason))
        };

        let (stem, extension) = input
            .rsplit_once('.')
            .ok_or_else(|| invalid("missing extension"))?;
        let (uuid_str, ts_str) = stem
            .split_once('_')
            .ok_or_else(|| invalid("missing '_' separator"))?;

        if uuid_str.len() != HYPHENATED_UUID_LEN {
            return Err(invalid("UUID must be hyphenated"));
        }
        let uuid = Uuid::parse_str(uuid_str).map_err(|e| invalid(&e.to_string()))?;
        if uuid.hyphenated().to_string() != uuid_str {
            return Err(invalid("UUID must be lowercase"));
        }

        if ts_str.len() != TIMESTAMP_LEN || !ts_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("timestamp must be 14 digits"));
        }
        let timestamp = NaiveDateTime::parse_from_str(ts_str, TIMESTAMP_FORMAT)
            .map_err(|e| invalid(&e.to_string()))?;

        if extension.is_empty() || !extension.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(invalid("extension must be alphanumeric"));
        }
        if extension.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(invalid("extension must be lowercase"));
        }

        Ok(Self {
            uuid,
            timestamp,
            extension: extension.to_owned(),
        })
    }

    /// Returns the UUID component.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the timestamp component (UTC, seconds precision).
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Returns the lowercase extension, without the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

fn validate_extension(extension: &str) -> UuidResult<String> {
    if extension.is_empty() || !extension.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(UuidError::InvalidInput(format!(
            "Extension must be non-empty ASCII alphanumerics, got: '{}'",
            extension
        )));
    }
    Ok(extension.to_ascii_lowercase())
}

fn truncate_to_seconds(timestamp: NaiveDateTime) -> UuidResult<NaiveDateTime> {
    // Round-trip through the textual form so the value always equals what `parse` would yield.
    let text = timestamp.format(TIMESTAMP_FORMAT).to_string();
    NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).map_err(|e| {
        UuidError::InvalidInput(format!("Timestamp cannot be formatted as '{}': {}", text, e))
    })
}

impl fmt::Display for StoredName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}.{}",
            self.uuid.hyphenated(),
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.extension
        )
    }
}

impl FromStr for StoredName {
    type Err = UuidError;

    /// Equivalent to [`StoredName::parse`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoredName::parse(s)
    }
}
