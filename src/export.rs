//! Document retrieval and export assembly.
//!
//! [`Exporter`] is the entry point used by the HTTP server and the
//! `gazette download` command. A download moves through these steps:
//!
//! ```text
//! resolving ──▶ fetching ──▶ bundling ──▶ responding
//!     │            │            │
//!     └────────────┴────────────┴──▶ failed (ExportError)
//! ```
//!
//! Each request fetches its own copy of the bytes; nothing is shared or
//! cached between requests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::bundle::{BundleMode, Bundler, Payload, ZipBundler};
use crate::config::Config;
use crate::error::ExportError;
use crate::fetch::ByteFetcher;
use crate::filename::base_name;
use crate::gateway::{MetadataGateway, SqliteGateway};
use crate::location::resolve_file;
use crate::models::{FileRecord, ObjectType};

/// Resolves, fetches, and bundles documents for download.
#[derive(Clone)]
pub struct Exporter {
    gateway: Arc<dyn MetadataGateway>,
    fetcher: ByteFetcher,
    bundler: Arc<dyn Bundler>,
}

impl Exporter {
    /// Exporter with the in-memory ZIP bundler.
    pub fn new(gateway: Arc<dyn MetadataGateway>, fetcher: ByteFetcher) -> Self {
        Self {
            gateway,
            fetcher,
            bundler: Arc::new(ZipBundler),
        }
    }

    /// Replace the bundler.
    pub fn with_bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = bundler;
        self
    }

    /// Build an exporter over the SQLite store and fetch settings in `config`.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let gateway = SqliteGateway::connect(config).await?;
        let fetcher = ByteFetcher::new(&config.fetch)?;
        Ok(Self::new(Arc::new(gateway), fetcher))
    }

    pub fn gateway(&self) -> &Arc<dyn MetadataGateway> {
        &self.gateway
    }

    /// Resolve the file's location and fetch its bytes.
    pub async fn resolve_and_fetch(&self, file: &FileRecord) -> Result<Vec<u8>, ExportError> {
        let plan = resolve_file(file);
        let candidate = plan.candidate();
        debug!(
            file_id = file.id,
            candidate = candidate.as_deref().unwrap_or("-"),
            plan = ?plan,
            "resolved fetch plan"
        );
        Ok(self.fetcher.fetch(&plan).await?)
    }

    /// Fetch the file and shape it into a download payload.
    ///
    /// The publication is looked up before any bytes are fetched. The
    /// summary is only looked up in archive mode; a missing summary is not
    /// an error, the bundler writes a placeholder instead.
    pub async fn build_download_payload(
        &self,
        file: &FileRecord,
        mode: BundleMode,
    ) -> Result<Payload, ExportError> {
        let publication = self
            .gateway
            .get_publication_for_file(file.id)
            .await?
            .ok_or_else(|| {
                ExportError::NotFound(format!("publication for file {}", file.id))
            })?;
        let name = base_name(&publication, file.id);

        let document = self.resolve_and_fetch(file).await?;

        let summary = match mode {
            BundleMode::Archive => self
                .gateway
                .get_latest_summary(ObjectType::Publication, file.publication_id)
                .await?
                .map(|s| s.text),
            BundleMode::Document => None,
        };

        let payload = self.bundler.assemble(
            mode,
            document,
            file.mime_type.as_deref(),
            summary.as_deref(),
            &name,
        )?;

        info!(
            file_id = file.id,
            mode = ?mode,
            bytes = payload.bytes.len(),
            name = %payload.download_name,
            "download payload ready"
        );
        Ok(payload)
    }

    /// Look up a file by id and build its download payload.
    pub async fn download(&self, file_id: i64, mode: BundleMode) -> Result<Payload, ExportError> {
        let file = self
            .gateway
            .get_file_by_id(file_id)
            .await?
            .ok_or_else(|| ExportError::NotFound(format!("file {}", file_id)))?;
        self.build_download_payload(&file, mode).await
    }
}

/// CLI entry point for `gazette download`.
///
/// Writes the payload to `output`, or to its download name in the current
/// directory. Returns the path written.
pub async fn run_download(
    config: &Config,
    file_id: i64,
    bundle: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    let mode = BundleMode::from_param(bundle)?;
    let exporter = Exporter::from_config(config).await?;
    let payload = exporter.download(file_id, mode).await?;

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(&payload.download_name),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&path, &payload.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "Wrote {} ({} bytes, {})",
        path.display(),
        payload.bytes.len(),
        payload.mime_type
    );
    Ok(path)
}
