//! # API REST
//!
//! HTTP adapter over the filedrop storage engine.
//!
//! Handles:
//! - HTTP endpoints with axum (upload, batch upload, list, delete, inline serving)
//! - OpenAPI documentation at `/api-docs/openapi.json`
//! - REST-specific concerns (multipart decoding, JSON bodies, CORS, body limits)
//!
//! All validation lives in `filedrop-files`; this crate only maps requests onto
//! [`FilesService`] calls and [`filedrop_files::FilesError`] kinds onto status codes.

#![warn(rust_2018_idioms)]

pub mod config;
mod error;
mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use filedrop_files::FilesService;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub use config::{CorsOrigins, RestConfig};
pub use error::{ApiError, ErrorRes};
pub use handlers::{DeleteRes, FileEntry, HealthRes, UploadBatchRes, UploadOutcome, UploadRes};

/// Application state for the REST API server
///
/// Holds the storage engine shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    files: Arc<FilesService>,
}

impl AppState {
    pub fn new(files: FilesService) -> Self {
        Self {
            files: Arc::new(files),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::upload_file,
        handlers::upload_multiple_files,
        handlers::list_files,
        handlers::delete_file,
        handlers::serve_file,
    ),
    components(schemas(
        HealthRes,
        UploadRes,
        UploadOutcome,
        UploadBatchRes,
        FileEntry,
        DeleteRes,
        ErrorRes,
    ))
)]
pub struct ApiDoc;

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE];

    match origins {
        CorsOrigins::Any => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
        CorsOrigins::List(list) => CorsLayer::new()
            .allow_origin(AllowOrigin::list(list.iter().cloned()))
            .allow_methods(methods)
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true),
    }
}

/// Build the REST router.
///
/// The `/api/files` routes carry the configured CORS policy; `/health` and the OpenAPI document
/// do not. The body limit from `config` replaces axum's default so that batch uploads of several
/// files near the per-file limit are accepted by the transport and judged by the engine.
pub fn router(state: AppState, config: &RestConfig) -> Router {
    let files = Router::new()
        .route("/api/files", get(handlers::list_files))
        .route("/api/files/upload", post(handlers::upload_file))
        .route(
            "/api/files/upload-multiple",
            post(handlers::upload_multiple_files),
        )
        .route("/api/files/:filename", delete(handlers::delete_file))
        .route("/api/files/files/:filename", get(handlers::serve_file))
        .layer(cors_layer(config.cors_origins()));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api-docs/openapi.json", get(handlers::openapi_json))
        .merge(files)
        .layer(DefaultBodyLimit::max(config.body_limit()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BODY_LIMIT_BYTES;
    use axum::body::Body;
    use axum::http::{header, HeaderValue, Request, StatusCode};
    use filedrop_files::{StoredName, MAX_FILE_SIZE};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "filedrop-test-boundary";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRtest-image-bytes";

    struct Part<'a> {
        field: &'a str,
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    }

    fn part<'a>(
        field: &'a str,
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    ) -> Part<'a> {
        Part {
            field,
            filename,
            content_type,
            bytes,
        }
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for p in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    p.field, p.filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", p.content_type).as_bytes());
            body.extend_from_slice(p.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn test_config(cors_origins: CorsOrigins) -> RestConfig {
        RestConfig::new(
            PathBuf::from("unused"),
            "127.0.0.1:0".parse().unwrap(),
            cors_origins,
            DEFAULT_BODY_LIMIT_BYTES,
        )
        .unwrap()
    }

    fn test_app(temp_dir: &TempDir) -> Router {
        let files = FilesService::initialise(temp_dir.path()).unwrap();
        let config = test_config(CorsOrigins::List(vec![HeaderValue::from_static(
            "http://localhost:3000",
        )]));
        router(AppState::new(files), &config)
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let temp_dir = TempDir::new().unwrap();
        let response = test_app(&temp_dir)
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["ok"], true);
    }

    #[tokio::test]
    async fn test_upload_list_serve_delete_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir);

        let response = app
            .clone()
            .oneshot(multipart_request(
                "/api/files/upload",
                &[part("file", "Photo.PNG", "image/png", PNG)],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let filename = json["filename"].as_str().unwrap().to_owned();
        let parsed: StoredName = filename.parse().unwrap();
        assert_eq!(parsed.extension(), "png");

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/api/files"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["filename"], filename.as_str());
        assert_eq!(listed[0]["size"], PNG.len() as u64);

        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/api/files/files/{}", filename)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            format!("inline; filename=\"{}\"", filename).as_str()
        );
        assert_eq!(
            response.headers()[header::CONTENT_LENGTH],
            PNG.len().to_string().as_str()
        );
        assert_eq!(body_bytes(response).await, PNG);

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", &format!("/api/files/{}", filename)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        for request in [
            empty_request("DELETE", &format!("/api/files/{}", filename)),
            empty_request("GET", &format!("/api/files/files/{}", filename)),
        ] {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            let json = body_json(response).await;
            assert_eq!(json["error"], "not_found");
        }
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_type() {
        let temp_dir = TempDir::new().unwrap();
        let response = test_app(&temp_dir)
            .oneshot(multipart_request(
                "/api/files/upload",
                &[part("file", "archive.zip", "application/zip", b"PK\x03\x04")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let json = body_json(response).await;
        assert_eq!(json["error"], "unsupported_type");
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_traversal_name() {
        let temp_dir = TempDir::new().unwrap();
        let response = test_app(&temp_dir)
            .oneshot(multipart_request(
                "/api/files/upload",
                &[part("file", "../../evil.png", "image/png", PNG)],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_path");
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_file() {
        let temp_dir = TempDir::new().unwrap();
        let oversized = vec![0u8; MAX_FILE_SIZE as usize + 1];
        let response = test_app(&temp_dir)
            .oneshot(multipart_request(
                "/api/files/upload",
                &[part("file", "big.pdf", "application/pdf", &oversized)],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = body_json(response).await;
        assert_eq!(json["error"], "payload_too_large");
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_without_file_field_is_bad_request() {
        let temp_dir = TempDir::new().unwrap();
        let response = test_app(&temp_dir)
            .oneshot(multipart_request(
                "/api/files/upload",
                &[part("attachment", "photo.png", "image/png", PNG)],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_batch_upload_reports_each_part() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir);

        let response = app
            .clone()
            .oneshot(multipart_request(
                "/api/files/upload-multiple",
                &[
                    part("files", "a.png", "image/png", PNG),
                    part("files", "b.zip", "application/zip", b"PK\x03\x04"),
                    part("files", "c.jpg", "image/jpeg", b"\xFF\xD8\xFF\xE0jpeg-bytes"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);

        assert_eq!(results[0]["original_name"], "a.png");
        assert!(results[0]["stored_name"].is_string());
        assert!(results[0].get("error").is_none());

        assert_eq!(results[1]["original_name"], "b.zip");
        assert!(results[1].get("stored_name").is_none());
        assert_eq!(results[1]["error"]["error"], "unsupported_type");

        assert!(results[2]["stored_name"].is_string());

        let response = app
            .oneshot(empty_request("GET", "/api/files"))
            .await
            .unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_rejects_encoded_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let response = test_app(&temp_dir)
            .oneshot(empty_request("DELETE", "/api/files/..%2Fsecret.pdf"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_path");
    }

    #[tokio::test]
    async fn test_cors_preflight_for_configured_origin() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir);

        let preflight = |origin: &'static str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/api/files")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-requested-with")
                .body(Body::empty())
                .unwrap()
        };

        let response = app
            .clone()
            .oneshot(preflight("http://localhost:3000"))
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "x-requested-with"
        );

        let response = app.oneshot(preflight("http://evil.test")).await.unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_cors_wildcard_allows_any_origin() {
        let temp_dir = TempDir::new().unwrap();
        let files = FilesService::initialise(temp_dir.path()).unwrap();
        let app = router(AppState::new(files), &test_config(CorsOrigins::Any));

        let request = Request::builder()
            .method("GET")
            .uri("/api/files")
            .header(header::ORIGIN, "http://anywhere.test")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .is_none());
    }

    #[tokio::test]
    async fn test_openapi_document_lists_file_routes() {
        let temp_dir = TempDir::new().unwrap();
        let response = test_app(&temp_dir)
            .oneshot(empty_request("GET", "/api-docs/openapi.json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let paths = json["paths"].as_object().unwrap();
        assert!(paths.contains_key("/api/files"));
        assert!(paths.contains_key("/api/files/upload"));
        assert!(paths.contains_key("/api/files/files/{filename}"));
    }
}
