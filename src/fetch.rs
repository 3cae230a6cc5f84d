//! Byte fetcher.
//!
//! Executes a [`FetchPlan`] against its backend and returns the raw bytes.
//! HTTP candidates are read chunk by chunk with a bounded timeout; local
//! candidates are read in full. Nothing is cached or written to disk, and
//! no retries happen here.

use std::time::Duration;

use anyhow::Context;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::location::FetchPlan;

/// Upper bound on the buffer reserved up front for an HTTP body.
const MAX_PREALLOC_BYTES: u64 = 8 * 1024 * 1024;

/// Fetches document bytes over HTTP or from the local filesystem.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct ByteFetcher {
    client: reqwest::Client,
}

impl ByteFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, plan: &FetchPlan) -> Result<Vec<u8>, FetchError> {
        match plan {
            FetchPlan::Http { url } => self.fetch_http(url).await,
            FetchPlan::File { path } => {
                debug!(path = %path.display(), "reading local file");
                tokio::fs::read(path).await.map_err(|source| {
                    warn!(path = %path.display(), error = %source, "local file unreadable");
                    FetchError::Unreadable {
                        path: path.clone(),
                        source,
                    }
                })
            }
            FetchPlan::Unsupported { location } => Err(FetchError::Unsupported {
                location: location.clone(),
            }),
            FetchPlan::Unresolvable => Err(FetchError::Unresolvable),
        }
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url, "fetching over http");

        let network = |source: reqwest::Error| {
            warn!(url, error = %source, "http fetch failed");
            FetchError::Network {
                url: url.to_string(),
                source,
            }
        };

        let mut resp = self.client.get(url).send().await.map_err(network)?;

        let status = resp.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "upstream returned error status");
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Content-Length is only a hint; the upstream may lie about it.
        let hint = resp.content_length().unwrap_or(0).min(MAX_PREALLOC_BYTES) as usize;
        let mut body = Vec::with_capacity(hint);
        while let Some(chunk) = resp.chunk().await.map_err(network)? {
            body.extend_from_slice(&chunk);
        }

        debug!(url, bytes = body.len(), "http fetch complete");
        Ok(body)
    }
}
