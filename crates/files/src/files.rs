//! Storage service implementation
//!
//! This module provides [`FilesService`], which owns the storage root and implements the four
//! operations exposed to adapters: [`store`](FilesService::store),
//! [`list`](FilesService::list), [`delete`](FilesService::delete) and
//! [`resolve`](FilesService::resolve).
//!
//! # Security Model
//!
//! - The root is canonicalised once, at construction
//! - Stored names are synthesised; only the validated extension comes from the client
//! - Names passed to `delete`/`resolve` are normalised and must stay strictly inside the root,
//!   both lexically and after symlink resolution
//!
//! # Concurrency
//!
//! The service holds no mutable state and is `Send + Sync`. Concurrent calls are coordinated by
//! the filesystem alone: a `list` racing a `store` may or may not see the new file, and a
//! `delete` racing a `resolve` may leave the reader with `NotFound`.

use crate::constants::{FALLBACK_CONTENT_TYPE, MAX_FILE_SIZE, SNIFF_LEN, TEMP_FILE_PREFIX};
#[cfg(unix)]
use crate::constants::STORED_FILE_MODE;
use crate::paths::{is_strictly_within, resolve_within};
use crate::validation::validate_upload;
use crate::{FilesError, FilesResult};
use filedrop_uuid::StoredName;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An upload waiting to be stored.
///
/// Everything except the bytes is as declared by the client and untrusted. The value is
/// consumed by [`FilesService::store`].
#[derive(Debug)]
pub struct IncomingFile<R> {
    reader: R,
    original_name: String,
    size: u64,
    content_type: Option<String>,
}

impl<R: Read> IncomingFile<R> {
    /// Wraps a reader together with the client's declared name, size and content type.
    pub fn new(
        reader: R,
        original_name: impl Into<String>,
        size: u64,
        content_type: Option<String>,
    ) -> Self {
        Self {
            reader,
            original_name: original_name.into(),
            size,
            content_type,
        }
    }
}

impl<B: AsRef<[u8]>> IncomingFile<Cursor<B>> {
    /// Builds an upload from an in-memory buffer; the declared size is the buffer length.
    pub fn from_bytes(
        bytes: B,
        original_name: impl Into<String>,
        content_type: Option<String>,
    ) -> Self {
        let size = bytes.as_ref().len() as u64;
        Self::new(Cursor::new(bytes), original_name, size, content_type)
    }
}

impl<R> IncomingFile<R> {
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// A file present in the storage root.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoredFile {
    /// Generated filename, relative to the storage root
    pub filename: String,

    /// Size of the file in bytes
    pub size: u64,
}

/// A stored file opened for streaming back to a caller.
///
/// Always meant for inline display; see [`ResolvedFile::content_disposition`].
#[derive(Debug)]
pub struct ResolvedFile {
    file: File,
    filename: String,
    size: u64,
    content_type: String,
}

impl ResolvedFile {
    /// Name of the file within the storage root.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Size in bytes at the time the file was opened.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Detected media type, or [`FALLBACK_CONTENT_TYPE`] when detection was inconclusive.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// `Content-Disposition` value: `inline` with the filename restricted to safe ASCII.
    pub fn content_disposition(&self) -> String {
        let safe: String = self
            .filename
            .chars()
            .map(|c| match c {
                ' '..='~' if c != '"' && c != '\\' => c,
                _ => '_',
            })
            .collect();
        format!("inline; filename=\"{}\"", safe)
    }

    /// Consumes the handle, returning the open file positioned at its first byte.
    pub fn into_file(self) -> File {
        self.file
    }
}

/// Service for managing files within the storage root
///
/// # Design
///
/// - Root-scoped: each instance is bound to one directory for its whole lifetime
/// - Flat: stored files live directly in the root, no subdirectories are created
/// - Atomic writes: uploads become visible only once fully written
/// - Contained: all caller-supplied names are checked against the root
#[derive(Debug)]
pub struct FilesService {
    /// Canonical storage root
    root_directory: PathBuf,
}

impl FilesService {
    /// Prepares the storage root and returns a service bound to it.
    ///
    /// Creates `root_directory` (and its parents) if missing, canonicalises it, and checks that
    /// it is a writable directory. Callers should treat failure as fatal: no request can be
    /// served without a usable root.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::StorageIo`] if the directory cannot be created, resolved, or
    /// written to, or if the path exists but is not a directory.
    pub fn initialise(root_directory: &Path) -> FilesResult<Self> {
        fs::create_dir_all(root_directory).map_err(|e| {
            io_context(
                e,
                format!(
                    "Could not create upload directory {}",
                    root_directory.display()
                ),
            )
        })?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            io_context(
                e,
                format!("Cannot canonicalize path {}", root_directory.display()),
            )
        })?;

        if !root_directory.is_dir() {
            return Err(FilesError::StorageIo(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Path is not a directory: {}", root_directory.display()),
            )));
        }

        // Anonymous temp files are unlinked on creation, so this leaves nothing behind.
        tempfile::tempfile_in(&root_directory).map_err(|e| {
            io_context(
                e,
                format!(
                    "Upload directory is not writable: {}",
                    root_directory.display()
                ),
            )
        })?;

        info!(root = %root_directory.display(), "storage root ready");

        Ok(Self { root_directory })
    }

    /// Returns the canonical storage root.
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Validates an upload and writes it under a newly generated name.
    ///
    /// The policy checks (size, name, extension, content type) run before any I/O. The bytes
    /// are then streamed into a hidden temporary file inside the root, synced, and renamed onto
    /// the generated name, replacing any file that somehow already has it.
    ///
    /// The declared size is checked up front, and the stream itself is cut off one byte past
    /// [`MAX_FILE_SIZE`], so an under-declared upload is still rejected.
    ///
    /// # Returns
    ///
    /// The generated [`StoredName`]; its `Display` form is the filename on disk.
    ///
    /// # Errors
    ///
    /// - [`FilesError::PayloadTooLarge`] if the declared or actual size exceeds the limit
    /// - [`FilesError::InvalidPath`] if the cleaned original name contains `..`
    /// - [`FilesError::UnsupportedType`] if the extension or content type is not allowed
    /// - [`FilesError::StorageIo`] if writing fails; no partial file is left behind
    pub fn store<R: Read>(&self, incoming: IncomingFile<R>) -> FilesResult<StoredName> {
        let IncomingFile {
            mut reader,
            original_name,
            size,
            content_type,
        } = incoming;

        let extension =
            validate_upload(&original_name, size, content_type.as_deref()).map_err(|e| {
                debug!(original_name = %original_name, size, error = %e, "upload rejected");
                e
            })?;

        let stored_name = StoredName::generate(&extension)
            .map_err(|e| FilesError::UnsupportedType(e.to_string()))?;
        let target = self.root_directory.join(stored_name.to_string());

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(&self.root_directory)
            .map_err(|e| {
                io_context(
                    e,
                    format!(
                        "Could not create temporary file in {}",
                        self.root_directory.display()
                    ),
                )
            })?;

        // Dropping `temp` on any early return removes the temporary file.
        let written = io::copy(&mut reader.by_ref().take(MAX_FILE_SIZE + 1), &mut temp)
            .map_err(|e| io_context(e, format!("Could not store file {}", stored_name)))?;

        if written > MAX_FILE_SIZE {
            debug!(
                original_name = %original_name,
                declared = size,
                "upload stream exceeded size limit"
            );
            return Err(FilesError::PayloadTooLarge(format!(
                "File content exceeds limit of 5 MiB ({} bytes)",
                MAX_FILE_SIZE
            )));
        }

        temp.flush()
            .and_then(|()| set_stored_permissions(temp.as_file()))
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| io_context(e, format!("Could not store file {}", stored_name)))?;

        temp.persist(&target).map_err(|e| {
            io_context(
                e.error,
                format!("Could not store file {}. Please try again!", stored_name),
            )
        })?;

        info!(
            stored_name = %stored_name,
            original_name = %original_name,
            bytes = written,
            "file stored"
        );

        Ok(stored_name)
    }

    /// Lists the regular files directly inside the storage root.
    ///
    /// Directories, symlinks, special files and in-flight uploads are skipped, as are entries
    /// that disappear while the directory is being read. Results are sorted by filename.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::StorageIo`] if the root itself cannot be read.
    pub fn list(&self) -> FilesResult<Vec<StoredFile>> {
        let entries = fs::read_dir(&self.root_directory).map_err(|e| {
            io_context(
                e,
                format!("Could not list files in {}", self.root_directory.display()),
            )
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };

            let filename = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(name) => {
                    warn!(name = ?name, "skipping entry with non UTF-8 name");
                    continue;
                }
            };

            if filename.starts_with(TEMP_FILE_PREFIX) {
                continue;
            }

            // DirEntry::metadata does not follow symlinks.
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(filename = %filename, error = %e, "skipping entry without metadata");
                    continue;
                }
            };

            if metadata.is_file() {
                files.push(StoredFile {
                    filename,
                    size: metadata.len(),
                });
            }
        }

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    /// Permanently removes a stored file.
    ///
    /// # Errors
    ///
    /// - [`FilesError::InvalidPath`] if `filename` resolves outside the root
    /// - [`FilesError::NotFound`] if there is no regular file under that name
    /// - [`FilesError::StorageIo`] if the removal itself fails
    pub fn delete(&self, filename: &str) -> FilesResult<()> {
        let path = self.locate(filename)?;

        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => not_found(filename),
            _ => io_context(e, format!("Failed to delete file: {}", filename)),
        })?;

        info!(filename = %filename, "file deleted");
        Ok(())
    }

    /// Opens a stored file for streaming and detects its content type.
    ///
    /// The type is sniffed from the leading bytes first, then guessed from the extension, and
    /// finally falls back to [`FALLBACK_CONTENT_TYPE`].
    ///
    /// # Errors
    ///
    /// - [`FilesError::InvalidPath`] if `filename` resolves outside the root
    /// - [`FilesError::NotFound`] if the file does not exist or cannot be opened for reading
    /// - [`FilesError::StorageIo`] if reading the file header fails
    pub fn resolve(&self, filename: &str) -> FilesResult<ResolvedFile> {
        let path = self.locate(filename)?;

        let mut file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => not_found(filename),
            _ => io_context(e, format!("Could not open file: {}", filename)),
        })?;

        let size = file
            .metadata()
            .map_err(|e| io_context(e, format!("Could not read metadata: {}", filename)))?
            .len();

        let content_type = detect_content_type(&mut file, &path)
            .map_err(|e| io_context(e, format!("Could not read file: {}", filename)))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_owned());

        Ok(ResolvedFile {
            file,
            filename: name,
            size,
            content_type,
        })
    }

    /// Resolves an untrusted name to an existing regular file inside the root.
    ///
    /// The returned path is the lexical one, so deleting it removes a symlink rather than its
    /// target; the symlink target has still been checked for containment.
    fn locate(&self, filename: &str) -> FilesResult<PathBuf> {
        let path = resolve_within(&self.root_directory, filename)?;

        let canonical = path.canonicalize().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => not_found(filename),
            _ => io_context(e, format!("Could not resolve file: {}", filename)),
        })?;

        if !is_strictly_within(&self.root_directory, &canonical) {
            return Err(FilesError::InvalidPath(format!(
                "Filename resolves outside the storage directory: {}",
                filename
            )));
        }

        let metadata = fs::metadata(&canonical).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => not_found(filename),
            _ => io_context(e, format!("Could not read metadata: {}", filename)),
        })?;

        if !metadata.is_file() {
            return Err(not_found(filename));
        }

        Ok(path)
    }
}

fn detect_content_type(file: &mut File, path: &Path) -> io::Result<String> {
    let mut header = Vec::new();
    Read::by_ref(file).take(SNIFF_LEN).read_to_end(&mut header)?;
    file.seek(SeekFrom::Start(0))?;

    let content_type = infer::get(&header)
        .map(|kind| kind.mime_type().to_owned())
        .or_else(|| {
            mime_guess::from_path(path)
                .first()
                .map(|mime| mime.essence_str().to_owned())
        })
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_owned());

    Ok(content_type)
}

/// Temporary files are created owner-only; stored files get ordinary `rw-r--r--` access.
#[cfg(unix)]
fn set_stored_permissions(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(STORED_FILE_MODE))
}

#[cfg(not(unix))]
fn set_stored_permissions(_file: &File) -> io::Result<()> {
    Ok(())
}

fn not_found(filename: &str) -> FilesError {
    FilesError::NotFound(format!("File not found: {}", filename))
}

fn io_context(e: io::Error, message: String) -> FilesError {
    FilesError::StorageIo(io::Error::new(e.kind(), format!("{}: {}", message, e)))
}
