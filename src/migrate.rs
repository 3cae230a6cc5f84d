use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Create publications table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS publications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dof_date TEXT NOT NULL,
            issue_number TEXT,
            type TEXT NOT NULL,
            source_url TEXT,
            sha256 TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create files table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            publication_id INTEGER NOT NULL,
            storage_uri TEXT NOT NULL,
            public_url TEXT,
            mime TEXT,
            bytes INTEGER,
            sha256 TEXT,
            has_ocr INTEGER NOT NULL DEFAULT 0,
            pages_count INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (publication_id) REFERENCES publications(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create pages table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL,
            page_no INTEGER NOT NULL,
            text TEXT,
            image_uri TEXT,
            checksum TEXT,
            UNIQUE(file_id, page_no),
            FOREIGN KEY (file_id) REFERENCES files(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create summaries table; object_id points at a publication or an item
    // depending on object_type, so it carries no foreign key.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            object_type TEXT NOT NULL CHECK (object_type IN ('publication', 'item')),
            object_id INTEGER NOT NULL,
            model TEXT,
            model_version TEXT,
            lang TEXT,
            summary_text TEXT NOT NULL,
            confidence REAL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_publication_id ON files(publication_id)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pages_file_id ON pages(file_id)")
        .execute(&pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_summaries_object \
         ON summaries(object_type, object_id, created_at DESC)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
