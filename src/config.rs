//! TOML configuration parsing.
//!
//! All connection settings are read from one file and passed explicitly to
//! the metadata gateway, the fetcher, and the server.
//!
//! ```toml
//! [db]
//! path = "./data/gazette.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! list_limit = 5
//!
//! [fetch]
//! timeout_secs = 30
//!
//! [reindex]
//! pdf_root = "./DOF_PDF"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub reindex: ReindexConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Rows returned by `GET /dof/files` when no `limit` is given.
    #[serde(default = "default_list_limit")]
    pub list_limit: i64,
}

fn default_list_limit() -> i64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("gazette-archive/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReindexConfig {
    #[serde(default = "default_pdf_root")]
    pub pdf_root: PathBuf,
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            pdf_root: default_pdf_root(),
        }
    }
}

fn default_pdf_root() -> PathBuf {
    PathBuf::from("./DOF_PDF")
}

impl Config {
    /// Builds a config around a database path with every other setting at
    /// its default. Used by tests and embedders that skip the TOML file.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig { path: path.into() },
            server: ServerConfig {
                bind: "127.0.0.1:8000".to_string(),
                list_limit: default_list_limit(),
            },
            fetch: FetchConfig::default(),
            reindex: ReindexConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.server.list_limit < 1 {
        anyhow::bail!("server.list_limit must be >= 1");
    }

    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be > 0");
    }

    Ok(())
}
