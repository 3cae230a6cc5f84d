//! # Gazette Archive CLI (`gazette`)
//!
//! ## Usage
//!
//! ```bash
//! gazette --config ./config/gazette.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gazette init` | Create the SQLite database and run schema migrations |
//! | `gazette seed` | Insert a sample publication, file, page, and summary |
//! | `gazette register <pub> <path>` | Register a local PDF under a publication |
//! | `gazette files` | List the newest files |
//! | `gazette get <id>` | Show a file with its pages and summary |
//! | `gazette download <id>` | Write the document or ZIP bundle to disk |
//! | `gazette reindex` | Recount PDF pages under `[reindex] pdf_root` |
//! | `gazette serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use gazette_archive::{config, export, get, migrate, reindex, seed, server};

/// Gazette Archive: archive and download service for scanned
/// government-gazette publications.
#[derive(Parser)]
#[command(
    name = "gazette",
    about = "Gazette Archive: archive and download service for scanned gazette publications",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/gazette.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Insert a sample publication with one file, page, and summary.
    Seed,

    /// Register a local PDF under an existing publication.
    Register {
        /// Publication id.
        publication_id: i64,
        /// Path to the document.
        path: PathBuf,
        /// Public HTTP mirror of the same document.
        #[arg(long)]
        public_url: Option<String>,
    },

    /// List the newest files.
    Files {
        /// Maximum number of rows (defaults to `[server].list_limit`).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show a file with its pages and summary.
    Get {
        /// File id.
        id: i64,
    },

    /// Fetch a file and write it (or its ZIP bundle) to disk.
    Download {
        /// File id.
        id: i64,
        /// `pdf` (default) or `zip`.
        #[arg(long)]
        bundle: Option<String>,
        /// Output path. Defaults to the download name in the current directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Recount pages of the PDFs under `[reindex] pdf_root`.
    Reindex {
        /// Recount every PDF, not only rows without a page count.
        #[arg(long)]
        all: bool,
    },

    /// Start the HTTP server.
    Serve,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Seed => {
            seed::run_seed(&cfg).await?;
        }
        Commands::Register {
            publication_id,
            path,
            public_url,
        } => {
            seed::run_register(&cfg, publication_id, &path, public_url.as_deref()).await?;
        }
        Commands::Files { limit } => {
            get::run_files(&cfg, limit).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, id).await?;
        }
        Commands::Download { id, bundle, output } => {
            export::run_download(&cfg, id, bundle.as_deref(), output.as_deref()).await?;
        }
        Commands::Reindex { all } => {
            reindex::run_reindex(&cfg, all).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
