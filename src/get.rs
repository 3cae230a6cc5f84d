//! File listing and detail retrieval.
//!
//! Read-only queries behind `GET /dof/files`, `GET /dof/files/{id}`, and the
//! `gazette files` / `gazette get` commands.

use anyhow::{bail, Result};
use serde::Serialize;
use sqlx::Row;

use crate::config::Config;
use crate::gateway::{MetadataGateway, SqliteGateway};
use crate::models::ObjectType;

/// One row of the file listing, joined with its publication.
#[derive(Debug, Clone, Serialize)]
pub struct FileListing {
    pub id: i64,
    pub publication_id: i64,
    pub storage_uri: String,
    pub mime: Option<String>,
    pub bytes: Option<i64>,
    pub sha256: Option<String>,
    pub has_ocr: bool,
    pub pages_count: i64,
    pub publication_date: String,
    pub publication_type: String,
    pub source_url: Option<String>,
}

/// A file with its pages and latest publication summary.
#[derive(Debug, Clone, Serialize)]
pub struct FileDetail {
    pub id: i64,
    pub publication_id: i64,
    pub storage_uri: String,
    pub mime: Option<String>,
    pub has_ocr: bool,
    pub pages: Vec<PageResponse>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    pub page_no: i64,
    pub text: Option<String>,
    pub image_uri: Option<String>,
}

/// Newest files first, by gazette date then file id.
pub async fn list_files(gateway: &SqliteGateway, limit: i64) -> Result<Vec<FileListing>> {
    let rows = sqlx::query(
        r#"
        SELECT
            f.id,
            f.publication_id,
            f.storage_uri,
            f.mime,
            f.bytes,
            f.sha256,
            f.has_ocr,
            f.pages_count,
            p.dof_date   AS publication_date,
            p.type       AS publication_type,
            p.source_url AS source_url
        FROM files f
        JOIN publications p ON f.publication_id = p.id
        ORDER BY p.dof_date DESC, f.id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(gateway.pool())
    .await?;

    Ok(rows
        .iter()
        .map(|row| FileListing {
            id: row.get("id"),
            publication_id: row.get("publication_id"),
            storage_uri: row.get("storage_uri"),
            mime: row.get("mime"),
            bytes: row.get("bytes"),
            sha256: row.get("sha256"),
            has_ocr: row.get("has_ocr"),
            pages_count: row.get("pages_count"),
            publication_date: row.get("publication_date"),
            publication_type: row.get("publication_type"),
            source_url: row.get("source_url"),
        })
        .collect())
}

/// File detail, or `None` when no file has this id.
pub async fn get_file_detail(gateway: &SqliteGateway, id: i64) -> Result<Option<FileDetail>> {
    let file_row = sqlx::query(
        "SELECT id, publication_id, storage_uri, mime, has_ocr FROM files WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(gateway.pool())
    .await?;

    let file_row = match file_row {
        Some(row) => row,
        None => return Ok(None),
    };

    let page_rows = sqlx::query(
        "SELECT page_no, text, image_uri FROM pages WHERE file_id = ? ORDER BY page_no",
    )
    .bind(id)
    .fetch_all(gateway.pool())
    .await?;

    let pages = page_rows
        .iter()
        .map(|row| PageResponse {
            page_no: row.get("page_no"),
            text: row.get("text"),
            image_uri: row.get("image_uri"),
        })
        .collect();

    let publication_id: i64 = file_row.get("publication_id");
    let summary = gateway
        .get_latest_summary(ObjectType::Publication, publication_id)
        .await?
        .map(|s| s.text);

    Ok(Some(FileDetail {
        id: file_row.get("id"),
        publication_id,
        storage_uri: file_row.get("storage_uri"),
        mime: file_row.get("mime"),
        has_ocr: file_row.get("has_ocr"),
        pages,
        summary,
    }))
}

/// CLI entry point for `gazette files`.
pub async fn run_files(config: &Config, limit: Option<i64>) -> Result<()> {
    let gateway = SqliteGateway::connect(config).await?;
    let files = list_files(&gateway, limit.unwrap_or(config.server.list_limit)).await?;

    if files.is_empty() {
        println!("No files.");
        gateway.pool().close().await;
        return Ok(());
    }

    println!(
        "{:<6} {:<12} {:<8} {:>6} {:<4} STORAGE",
        "ID", "DATE", "TYPE", "PAGES", "OCR"
    );
    for f in &files {
        println!(
            "{:<6} {:<12} {:<8} {:>6} {:<4} {}",
            f.id,
            f.publication_date,
            f.publication_type,
            f.pages_count,
            if f.has_ocr { "yes" } else { "no" },
            f.storage_uri
        );
    }

    gateway.pool().close().await;
    Ok(())
}

/// CLI entry point for `gazette get`.
pub async fn run_get(config: &Config, id: i64) -> Result<()> {
    let gateway = SqliteGateway::connect(config).await?;
    let detail = get_file_detail(&gateway, id).await?;
    gateway.pool().close().await;

    let detail = match detail {
        Some(d) => d,
        None => bail!("file not found: {}", id),
    };

    println!("--- File ---");
    println!("id:             {}", detail.id);
    println!("publication_id: {}", detail.publication_id);
    println!("storage_uri:    {}", detail.storage_uri);
    println!(
        "mime:           {}",
        detail.mime.as_deref().unwrap_or("(unknown)")
    );
    println!("has_ocr:        {}", detail.has_ocr);
    println!();

    println!("--- Summary ---");
    println!(
        "{}",
        detail.summary.as_deref().unwrap_or("(no summary)")
    );
    println!();

    println!("--- Pages ({}) ---", detail.pages.len());
    for page in &detail.pages {
        println!("[page {}]", page.page_no);
        if let Some(ref uri) = page.image_uri {
            println!("image: {}", uri);
        }
        println!("{}", page.text.as_deref().unwrap_or(""));
        println!();
    }

    Ok(())
}
