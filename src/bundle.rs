//! Export bundling.
//!
//! Turns fetched document bytes into a download [`Payload`]: either the
//! document as-is, or a deflate-compressed ZIP holding the document and its
//! summary. The [`Bundler`] trait is the seam for alternative (for example
//! streaming) implementations; [`ZipBundler`] buffers everything in memory.

use std::io::{Cursor, Write};
use std::str::FromStr;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ExportError;
use crate::filename::sanitize;

/// Archive entry holding the document bytes.
pub const DOCUMENT_ENTRY: &str = "document.pdf";
/// Archive entry holding the summary text.
pub const SUMMARY_ENTRY: &str = "summary.txt";
/// Written to [`SUMMARY_ENTRY`] when the publication has no summary.
pub const SUMMARY_PLACEHOLDER: &str = "Sin resumen disponible.";

pub const DEFAULT_DOCUMENT_MIME: &str = "application/pdf";
pub const ARCHIVE_MIME: &str = "application/zip";

/// Shape of a download response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BundleMode {
    /// Raw document bytes.
    #[default]
    Document,
    /// ZIP with `document.pdf` and `summary.txt`.
    Archive,
}

impl BundleMode {
    /// Parse the optional `bundle` query parameter. Absent means
    /// [`BundleMode::Document`].
    pub fn from_param(param: Option<&str>) -> Result<Self, ExportError> {
        match param {
            None => Ok(BundleMode::Document),
            Some(value) => value.parse(),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            BundleMode::Document => "pdf",
            BundleMode::Archive => "zip",
        }
    }
}

impl FromStr for BundleMode {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "pdf" | "document" => Ok(BundleMode::Document),
            "zip" | "archive" => Ok(BundleMode::Archive),
            other => Err(ExportError::InvalidRequest(format!(
                "unknown bundle mode '{}': expected pdf or zip",
                other
            ))),
        }
    }
}

/// A ready-to-send download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub download_name: String,
}

/// Composes document bytes (and an optional summary) into a [`Payload`].
pub trait Bundler: Send + Sync {
    /// `recorded_mime` is the file's stored mime type, used in document mode.
    /// `base_name` gets sanitized again, so callers may pass it raw.
    fn assemble(
        &self,
        mode: BundleMode,
        document: Vec<u8>,
        recorded_mime: Option<&str>,
        summary: Option<&str>,
        base_name: &str,
    ) -> Result<Payload, ExportError>;
}

/// In-memory ZIP bundler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipBundler;

impl Bundler for ZipBundler {
    fn assemble(
        &self,
        mode: BundleMode,
        document: Vec<u8>,
        recorded_mime: Option<&str>,
        summary: Option<&str>,
        base_name: &str,
    ) -> Result<Payload, ExportError> {
        let download_name = format!("{}.{}", sanitize(base_name), mode.extension());

        match mode {
            BundleMode::Document => Ok(Payload {
                bytes: document,
                mime_type: recorded_mime
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(DEFAULT_DOCUMENT_MIME)
                    .to_string(),
                download_name,
            }),
            BundleMode::Archive => {
                let summary = summary.unwrap_or(SUMMARY_PLACEHOLDER);
                Ok(Payload {
                    bytes: write_archive(&document, summary)?,
                    mime_type: ARCHIVE_MIME.to_string(),
                    download_name,
                })
            }
        }
    }
}

fn write_archive(document: &[u8], summary: &str) -> Result<Vec<u8>, ExportError> {
    // Fixed timestamp so the same inputs always give the same archive bytes.
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file(DOCUMENT_ENTRY, options)?;
    zip.write_all(document)
        .map_err(|e| ExportError::Bundle(e.to_string()))?;

    zip.start_file(SUMMARY_ENTRY, options)?;
    zip.write_all(summary.as_bytes())
        .map_err(|e| ExportError::Bundle(e.to_string()))?;

    Ok(zip.finish()?.into_inner())
}
