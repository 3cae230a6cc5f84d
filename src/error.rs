//! Error types for the download path.
//!
//! [`FetchError`] is what the byte fetcher returns. [`ExportError`] is the
//! boundary error of [`Exporter`](crate::export::Exporter), returned by its
//! `resolve_and_fetch` and `build_download_payload` methods.
//! Each [`ExportError`] kind maps to one stable HTTP status and error code,
//! so clients can tell "will never work" (501) from "try again" (502).

use std::path::PathBuf;
use thiserror::Error;

/// Failure while executing a [`FetchPlan`](crate::location::FetchPlan).
#[derive(Debug, Error)]
pub enum FetchError {
    /// No location rule matched the file's descriptors.
    #[error("no fetchable location could be resolved")]
    Unresolvable,

    /// Remote-bucket reference without an HTTP alias.
    #[error("location '{location}' requires an http(s) public URL or a presigned URL")]
    Unsupported { location: String },

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Connection, timeout, or body read failure.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The local file could not be opened or read.
    #[error("cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error kinds surfaced by the download path.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No file record, or no resolvable location.
    #[error("not found: {0}")]
    NotFound(String),

    /// Remote-bucket scheme without a usable public alias. Terminal.
    #[error("not available: {0}")]
    UnsupportedLocation(String),

    /// Transient fetch failure (network, upstream status, unreadable file).
    #[error("fetch failed: {0}")]
    FetchFailed(#[source] FetchError),

    /// Malformed request parameter.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Writing the archive failed.
    #[error("bundle error: {0}")]
    Bundle(String),

    /// The metadata store failed.
    #[error("metadata store error: {0}")]
    Gateway(#[from] anyhow::Error),
}

impl From<FetchError> for ExportError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Unresolvable => ExportError::NotFound(err.to_string()),
            FetchError::Unsupported { .. } => ExportError::UnsupportedLocation(err.to_string()),
            FetchError::HttpStatus { .. }
            | FetchError::Network { .. }
            | FetchError::Unreadable { .. } => ExportError::FetchFailed(err),
        }
    }
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        ExportError::Bundle(err.to_string())
    }
}

impl ExportError {
    pub fn status_code(&self) -> u16 {
        match self {
            ExportError::InvalidRequest(_) => 400,
            ExportError::NotFound(_) => 404,
            ExportError::Bundle(_) | ExportError::Gateway(_) => 500,
            ExportError::UnsupportedLocation(_) => 501,
            ExportError::FetchFailed(_) => 502,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ExportError::InvalidRequest(_) => "bad_request",
            ExportError::NotFound(_) => "not_found",
            ExportError::Bundle(_) => "bundle_error",
            ExportError::Gateway(_) => "internal",
            ExportError::UnsupportedLocation(_) => "not_implemented",
            ExportError::FetchFailed(_) => "fetch_failed",
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExportError::FetchFailed(_) | ExportError::Gateway(_))
    }
}
