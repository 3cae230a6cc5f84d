//! Fixture seeding and local file registration.
//!
//! `gazette seed` inserts a small, realistic publication so the server has
//! something to list. `gazette register` adds a PDF that already sits on the
//! local filesystem, recording its size and SHA-256 digest.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Row ids created by [`seed_fixture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedIds {
    pub publication_id: i64,
    pub file_id: i64,
    pub page_id: i64,
    pub summary_id: i64,
}

pub async fn seed_fixture(pool: &SqlitePool) -> Result<SeedIds> {
    let mut tx = pool.begin().await?;

    let publication_id = sqlx::query(
        "INSERT INTO publications (dof_date, issue_number, type, source_url, sha256, status) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind("2025-11-06")
    .bind("478(4)")
    .bind("DOF")
    .bind("http://www.dof.gob.mx/478_4.pdf")
    .bind("a1b2c3d4e5f6g7h8i9j0k1l2m3n4o5p6")
    .bind("summarized")
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let file_id = sqlx::query(
        "INSERT INTO files (publication_id, storage_uri, mime, bytes, sha256, has_ocr, pages_count) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(publication_id)
    .bind("s3://dof-files/2025/11/06/file.pdf")
    .bind("application/pdf")
    .bind(123_456_i64)
    .bind("f6e5d4c3b2a109877890123456789012")
    .bind(true)
    .bind(25_i64)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let page_text = "Texto de la página 1. Contiene la nueva Ley de Fomento a la Inversión.";
    let page_id = sqlx::query(
        "INSERT INTO pages (file_id, page_no, text, image_uri, checksum) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(file_id)
    .bind(1_i64)
    .bind(page_text)
    .bind("s3://dof-images/p1.jpg")
    .bind("chk-12345")
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let summary_id = sqlx::query(
        "INSERT INTO summaries (object_type, object_id, model, model_version, lang, \
                                summary_text, confidence, created_at) \
         VALUES ('publication', ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(publication_id)
    .bind("Gemini-2.5-Pro")
    .bind("v2.5")
    .bind("es")
    .bind("Resumen del decreto: principal cambio en incentivos fiscales para PYMES.")
    .bind(0.995_f64)
    .bind(Utc::now().timestamp())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    tx.commit().await?;

    Ok(SeedIds {
        publication_id,
        file_id,
        page_id,
        summary_id,
    })
}

/// Register a local document under an existing publication.
///
/// The stored location is the canonical absolute path, so downloads work
/// regardless of the server's working directory.
pub async fn register_file(
    pool: &SqlitePool,
    publication_id: i64,
    path: &Path,
    public_url: Option<&str>,
) -> Result<i64> {
    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM publications WHERE id = ?")
        .bind(publication_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        bail!("publication not found: {}", publication_id);
    }

    let canonical = std::fs::canonicalize(path)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let content = std::fs::read(&canonical)
        .with_context(|| format!("Failed to read {}", canonical.display()))?;

    let file_id = sqlx::query(
        "INSERT INTO files (publication_id, storage_uri, public_url, mime, bytes, sha256) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(publication_id)
    .bind(canonical.display().to_string())
    .bind(public_url)
    .bind(detect_mime(&canonical))
    .bind(content.len() as i64)
    .bind(hex_sha256(&content))
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(file_id)
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Detect a MIME type from the file extension.
fn detect_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// CLI entry point for `gazette seed`.
pub async fn run_seed(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let ids = seed_fixture(&pool).await?;
    pool.close().await;

    println!("Seeded fixture:");
    println!("  publication_id: {}", ids.publication_id);
    println!("  file_id:        {}", ids.file_id);
    println!("  page_id:        {}", ids.page_id);
    println!("  summary_id:     {}", ids.summary_id);
    Ok(())
}

/// CLI entry point for `gazette register`.
pub async fn run_register(
    config: &Config,
    publication_id: i64,
    path: &Path,
    public_url: Option<&str>,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let file_id = register_file(&pool, publication_id, path, public_url).await?;
    pool.close().await;

    println!("Registered {} as file {}", path.display(), file_id);
    Ok(())
}
