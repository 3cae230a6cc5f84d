//! Page-count maintenance.
//!
//! Walks the PDFs directly under `[reindex] pdf_root`, counts their pages,
//! and writes the count to every `files` row whose `storage_uri` is either
//! the PDF's file name or its absolute path. A PDF that cannot be parsed
//! counts as zero pages.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::config::Config;
use crate::db;

/// One applied page-count update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCountUpdate {
    pub file_name: String,
    pub pages: i64,
    pub rows: u64,
}

/// Recount pages for PDFs under `pdf_root`.
///
/// With `only_missing`, PDFs whose row already has a non-zero count are
/// skipped. Returns the updates that touched at least one row.
pub async fn reindex_pages(
    pool: &SqlitePool,
    pdf_root: &Path,
    only_missing: bool,
) -> Result<Vec<PageCountUpdate>> {
    let current: HashMap<String, i64> =
        sqlx::query("SELECT storage_uri, pages_count FROM files")
            .fetch_all(pool)
            .await?
            .iter()
            .map(|row| (row.get("storage_uri"), row.get("pages_count")))
            .collect();

    let mut updates = Vec::new();

    for pdf in list_pdfs(pdf_root)? {
        let file_name = match pdf.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };
        let full_path = std::fs::canonicalize(&pdf)
            .unwrap_or_else(|_| pdf.clone())
            .display()
            .to_string();

        let known = [&file_name, &full_path]
            .iter()
            .filter_map(|key| current.get(key.as_str()))
            .copied()
            .max()
            .unwrap_or(0);
        if only_missing && known != 0 {
            debug!(file = %file_name, pages = known, "page count present, skipping");
            continue;
        }

        let pages = tokio::task::spawn_blocking(move || count_pages(&pdf))
            .await
            .context("page counting task failed")?;

        let result =
            sqlx::query("UPDATE files SET pages_count = ? WHERE storage_uri IN (?, ?)")
                .bind(pages)
                .bind(&file_name)
                .bind(&full_path)
                .execute(pool)
                .await?;

        if result.rows_affected() > 0 {
            updates.push(PageCountUpdate {
                file_name,
                pages,
                rows: result.rows_affected(),
            });
        }
    }

    Ok(updates)
}

fn list_pdfs(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("Failed to read PDF directory: {}", root.display()))?;

    let mut pdfs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf && path.is_file() {
            pdfs.push(path);
        }
    }

    // Sort for deterministic ordering
    pdfs.sort();
    Ok(pdfs)
}

fn count_pages(path: &Path) -> i64 {
    match lopdf::Document::load(path) {
        Ok(doc) => doc.get_pages().len() as i64,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable PDF, counting 0 pages");
            0
        }
    }
}

/// CLI entry point for `gazette reindex`.
pub async fn run_reindex(config: &Config, all: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let updates = reindex_pages(&pool, &config.reindex.pdf_root, !all).await?;
    pool.close().await;

    if updates.is_empty() {
        println!("No changes.");
    } else {
        println!("Updated:");
        for u in &updates {
            println!("  {:<40} {:>5} pages ({} rows)", u.file_name, u.pages, u.rows);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_pdfs_in_sorted_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt", "c.pdf.bak"] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(tmp.path().join("dir.pdf")).unwrap();

        let names: Vec<String> = list_pdfs(tmp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn garbage_counts_as_zero_pages() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        assert_eq!(count_pages(&path), 0);
    }

    #[tokio::test]
    async fn reindex_updates_registered_rows() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = Config::with_db_path(tmp.path().join("gazette.sqlite"));
        crate::migrate::run_migrations(&cfg).await.unwrap();
        let pool = db::connect(&cfg).await.unwrap();
        crate::seed::seed_fixture(&pool).await.unwrap();

        let pdf_root = tmp.path().join("pdfs");
        std::fs::create_dir(&pdf_root).unwrap();
        let broken = pdf_root.join("broken.pdf");
        std::fs::write(&broken, b"not a pdf").unwrap();
        std::fs::write(pdf_root.join("unregistered.pdf"), b"x").unwrap();
        crate::seed::register_file(&pool, 1, &broken, None)
            .await
            .unwrap();

        let updates = reindex_pages(&pool, &pdf_root, true).await.unwrap();
        assert_eq!(
            updates,
            vec![PageCountUpdate {
                file_name: "broken.pdf".to_string(),
                pages: 0,
                rows: 1,
            }]
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(list_pdfs(Path::new("/no/such/pdf/root")).is_err());
    }
}
