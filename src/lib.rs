//! # Gazette Archive
//!
//! Archive and download service for scanned government-gazette
//! publications. Each publication has one or more PDF files, each file has
//! extracted pages, and a publication may carry a generated summary.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌─────────┐   ┌─────────┐
//! │   Metadata   │──▶│ Location │──▶│  Byte   │──▶│ Bundler │──▶ response
//! │   Gateway    │   │ Resolver │   │ Fetcher │   │  (ZIP)  │
//! └──────────────┘   └──────────┘   └─────────┘   └─────────┘
//!     SQLite          http / s3 /    reqwest /     document.pdf
//!                     local path     tokio::fs     + summary.txt
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! gazette init                       # create database
//! gazette seed                       # insert a sample publication
//! gazette register 1 ./DOF_PDF/a.pdf # add a local PDF
//! gazette download 2 --bundle zip    # write the ZIP bundle
//! gazette serve                      # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`location`] | Location descriptor resolution |
//! | [`fetch`] | HTTP and filesystem byte fetching |
//! | [`filename`] | Download filename sanitizing |
//! | [`bundle`] | Document / ZIP payload assembly |
//! | [`export`] | Download pipeline |
//! | [`gateway`] | Metadata store access |
//! | [`get`] | File listing and detail |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`seed`] | Fixture seeding and file registration |
//! | [`reindex`] | Page-count maintenance |

pub mod bundle;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod fetch;
pub mod filename;
pub mod gateway;
pub mod get;
pub mod location;
pub mod migrate;
pub mod models;
pub mod reindex;
pub mod seed;
pub mod server;
