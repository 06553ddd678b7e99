//! HTTP handlers for the file endpoints.
//!
//! Each handler decodes its request, runs the storage operation on the blocking thread pool,
//! and encodes the result. No validation happens here beyond what HTTP itself needs.

use crate::error::{ApiError, ErrorRes};
use crate::AppState;
use axum::body::{Body, Bytes};
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path as AxumPath, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use filedrop_files::{FilesResult, IncomingFile, StoredFile};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Result of a single-file upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadRes {
    /// Generated name the file was stored under
    pub filename: String,
    pub message: String,
}

/// Outcome of one part of a batch upload. Exactly one of `stored_name` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadOutcome {
    /// Filename declared by the client
    pub original_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRes>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadBatchRes {
    pub results: Vec<UploadOutcome>,
}

/// A stored file as listed by `GET /api/files`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileEntry {
    pub filename: String,
    /// Size in bytes
    pub size: u64,
}

impl From<StoredFile> for FileEntry {
    fn from(file: StoredFile) -> Self {
        Self {
            filename: file.filename,
            size: file.size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteRes {
    pub filename: String,
    pub message: String,
}

/// One decoded multipart file part, buffered in memory.
struct UploadPart {
    original_name: String,
    content_type: Option<String>,
    bytes: Bytes,
}

impl UploadPart {
    async fn read(field: Field<'_>) -> Result<Self, ApiError> {
        let original_name = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;

        Ok(Self {
            original_name,
            content_type,
            bytes,
        })
    }
}

/// Runs a storage operation on the blocking pool so disk I/O never stalls the runtime.
async fn run_blocking<T, F>(operation: F) -> Result<T, ApiError>
where
    F: FnOnce() -> FilesResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| ApiError::Internal(format!("storage task failed: {}", e)))?
        .map_err(ApiError::from)
}

async fn store_part(state: &AppState, part: UploadPart) -> Result<String, ApiError> {
    let files = state.files.clone();
    let stored = run_blocking(move || {
        files.store(IncomingFile::from_bytes(
            part.bytes,
            part.original_name,
            part.content_type,
        ))
    })
    .await?;

    Ok(stored.to_string())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
pub async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Filedrop REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/api/files/upload",
    request_body(content = String, content_type = "multipart/form-data", description = "Form with a `file` part"),
    responses(
        (status = 200, description = "File stored", body = UploadRes),
        (status = 400, description = "Malformed form, missing `file` part or unsafe filename", body = ErrorRes),
        (status = 413, description = "File larger than 5 MiB", body = ErrorRes),
        (status = 415, description = "Extension or content type not allowed", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Upload a single file
///
/// Reads the multipart part named `file` and stores it under a generated name. Other parts are
/// ignored.
///
/// # Errors
/// Returns the storage engine's error kind mapped to a status code, or `400 Bad Request` if the
/// form cannot be decoded or has no `file` part.
#[axum::debug_handler]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadRes>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let part = UploadPart::read(field).await?;
        let filename = store_part(&state, part).await?;

        return Ok(Json(UploadRes {
            message: format!("File uploaded successfully: {}", filename),
            filename,
        }));
    }

    Err(ApiError::BadRequest("missing multipart file field 'file'".into()))
}

#[utoipa::path(
    post,
    path = "/api/files/upload-multiple",
    request_body(content = String, content_type = "multipart/form-data", description = "Form with one or more `files` parts"),
    responses(
        (status = 200, description = "Per-file outcomes", body = UploadBatchRes),
        (status = 400, description = "Malformed form", body = ErrorRes)
    )
)]
/// Upload several files in one request
///
/// Every part named `files` is validated and stored independently; a rejected part is reported
/// in its outcome and does not affect the others.
///
/// # Errors
/// Only fails as a whole if the multipart stream itself cannot be decoded.
#[axum::debug_handler]
pub async fn upload_multiple_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadBatchRes>, ApiError> {
    let mut results = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("files") {
            continue;
        }

        let part = UploadPart::read(field).await?;
        let original_name = part.original_name.clone();

        let outcome = match store_part(&state, part).await {
            Ok(stored_name) => UploadOutcome {
                original_name,
                stored_name: Some(stored_name),
                error: None,
            },
            Err(e) => {
                tracing::info!("Batch upload part '{}' failed: {}", original_name, e.message());
                UploadOutcome {
                    original_name,
                    stored_name: None,
                    error: Some(e.to_body()),
                }
            }
        };
        results.push(outcome);
    }

    Ok(Json(UploadBatchRes { results }))
}

#[utoipa::path(
    get,
    path = "/api/files",
    responses(
        (status = 200, description = "All stored files", body = [FileEntry]),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// List stored files with their sizes
///
/// # Errors
/// Returns `500 Internal Server Error` if the storage directory cannot be read.
#[axum::debug_handler]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileEntry>>, ApiError> {
    let files = state.files.clone();
    let listed = run_blocking(move || files.list()).await?;
    Ok(Json(listed.into_iter().map(FileEntry::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/files/{filename}",
    params(("filename" = String, Path, description = "Stored filename")),
    responses(
        (status = 200, description = "File deleted", body = DeleteRes),
        (status = 400, description = "Filename resolves outside the storage directory", body = ErrorRes),
        (status = 404, description = "No such file", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Delete a stored file
#[axum::debug_handler]
pub async fn delete_file(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
) -> Result<Json<DeleteRes>, ApiError> {
    let files = state.files.clone();
    let target = filename.clone();
    run_blocking(move || files.delete(&target)).await?;

    Ok(Json(DeleteRes {
        message: format!("Deleted file: {}", filename),
        filename,
    }))
}

#[utoipa::path(
    get,
    path = "/api/files/files/{filename}",
    params(("filename" = String, Path, description = "Stored filename")),
    responses(
        (status = 200, description = "File content, served inline"),
        (status = 400, description = "Filename resolves outside the storage directory", body = ErrorRes),
        (status = 404, description = "No such file", body = ErrorRes)
    )
)]
/// Stream a stored file for inline display
///
/// Sets `Content-Type` to the detected media type and `Content-Disposition` to `inline`.
#[axum::debug_handler]
pub async fn serve_file(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
) -> Result<Response, ApiError> {
    let files = state.files.clone();
    let resolved = run_blocking(move || files.resolve(&filename)).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(resolved.content_type())
            .map_err(|_| ApiError::Internal("invalid detected content type".into()))?,
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&resolved.content_disposition())
            .map_err(|_| ApiError::Internal("invalid content disposition".into()))?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(resolved.size()));

    let file = tokio::fs::File::from_std(resolved.into_file());
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((StatusCode::OK, headers, body).into_response())
}

/// OpenAPI document for the REST API
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    Json(crate::ApiDoc::openapi())
}
