//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/dof/files?limit=N` | Newest files with publication data |
//! | `GET`  | `/dof/files/{id}` | File detail with pages and summary |
//! | `GET`  | `/dof/files/{id}/download?bundle=pdf\|zip` | Document or ZIP bundle |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "not found: file 42" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500),
//! `bundle_error` (500), `not_implemented` (501), `fetch_failed` (502).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front-ends
//! can call the API directly.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::bundle::{BundleMode, Payload};
use crate::config::Config;
use crate::error::ExportError;
use crate::export::Exporter;
use crate::fetch::ByteFetcher;
use crate::gateway::SqliteGateway;
use crate::get::{get_file_detail, list_files, FileDetail, FileListing};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    gateway: SqliteGateway,
    exporter: Exporter,
}

impl AppState {
    pub fn new(config: Arc<Config>, gateway: SqliteGateway, exporter: Exporter) -> Self {
        Self {
            config,
            gateway,
            exporter,
        }
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let gateway = SqliteGateway::connect(&config).await?;
    let fetcher = ByteFetcher::new(&config.fetch)?;
    let exporter = Exporter::new(Arc::new(gateway.clone()), fetcher);

    let app = router(AppState::new(config, gateway, exporter));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("gazette server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with all routes and the CORS layer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/dof/files", get(handle_list_files))
        .route("/dof/files/{id}", get(handle_file_detail))
        .route("/dof/files/{id}/download", get(handle_download))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError {
            status: StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        ExportError::Gateway(err).into()
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        ExportError::InvalidRequest(rejection.body_text()).into()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        ExportError::InvalidRequest(rejection.body_text()).into()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /dof/files ============

#[derive(Deserialize)]
struct ListParams {
    limit: Option<i64>,
}

async fn handle_list_files(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<FileListing>>, AppError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(state.config.server.list_limit);
    if limit < 1 {
        return Err(ExportError::InvalidRequest("limit must be >= 1".to_string()).into());
    }
    Ok(Json(list_files(&state.gateway, limit).await?))
}

// ============ GET /dof/files/{id} ============

async fn handle_file_detail(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<FileDetail>, AppError> {
    let Path(id) = id?;
    get_file_detail(&state.gateway, id)
        .await?
        .map(Json)
        .ok_or_else(|| ExportError::NotFound(format!("file {}", id)).into())
}

// ============ GET /dof/files/{id}/download ============

#[derive(Deserialize)]
struct DownloadParams {
    bundle: Option<String>,
}

async fn handle_download(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    params: Result<Query<DownloadParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let Query(params) = params?;
    let result = match BundleMode::from_param(params.bundle.as_deref()) {
        Ok(mode) => state.exporter.download(id, mode).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(payload) => Ok(attachment(payload)),
        Err(e) => {
            warn!(
                file_id = id,
                code = e.error_code(),
                retryable = e.is_retryable(),
                error = %e,
                "download failed"
            );
            Err(e.into())
        }
    }
}

fn attachment(payload: Payload) -> Response {
    let disposition = content_disposition(&payload.download_name);
    (
        [
            (header::CONTENT_TYPE, payload.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        payload.bytes,
    )
        .into_response()
}

/// `attachment; filename="…"` with an ASCII fallback, plus an RFC 5987
/// `filename*` parameter when the name has non-ASCII characters.
fn content_disposition(name: &str) -> String {
    if name.is_ascii() {
        return format!("attachment; filename=\"{}\"", name);
    }
    let fallback: String = name
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        percent_encode(name)
    )
}

/// Percent-encode everything except RFC 3986 unreserved characters.
fn percent_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}
