//! Metadata gateway.
//!
//! The download path only reads three things from the metadata store: a
//! file record, the publication it belongs to, and the latest summary. The
//! [`MetadataGateway`] trait captures exactly those reads so the export
//! pipeline can run against SQLite ([`SqliteGateway`]) or against in-memory
//! fixtures ([`InMemoryGateway`]).

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::models::{FileRecord, ObjectType, PublicationInfo, SummaryRecord};

/// Read-only access to file, publication, and summary records.
#[async_trait]
pub trait MetadataGateway: Send + Sync {
    async fn get_file_by_id(&self, id: i64) -> Result<Option<FileRecord>>;

    /// Most recently created summary for the object, if any.
    async fn get_latest_summary(
        &self,
        object_type: ObjectType,
        object_id: i64,
    ) -> Result<Option<SummaryRecord>>;

    async fn get_publication_for_file(&self, file_id: i64) -> Result<Option<PublicationInfo>>;
}

/// SQLite implementation of [`MetadataGateway`].
#[derive(Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database named in `[db] path`.
    pub async fn connect(config: &Config) -> Result<Self> {
        Ok(Self::new(db::connect(config).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MetadataGateway for SqliteGateway {
    async fn get_file_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let row = sqlx::query(
            "SELECT id, publication_id, storage_uri, public_url, mime, bytes, sha256 \
             FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| FileRecord {
            id: row.get("id"),
            publication_id: row.get("publication_id"),
            primary_location: row.get("storage_uri"),
            public_location: row.get("public_url"),
            mime_type: row.get("mime"),
            byte_size: row.get("bytes"),
            content_hash: row.get("sha256"),
        }))
    }

    async fn get_latest_summary(
        &self,
        object_type: ObjectType,
        object_id: i64,
    ) -> Result<Option<SummaryRecord>> {
        let row = sqlx::query(
            "SELECT summary_text, created_at FROM summaries \
             WHERE object_type = ? AND object_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(object_type.as_str())
        .bind(object_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let created_at: i64 = row.get("created_at");
            SummaryRecord {
                object_type,
                object_id,
                text: row.get("summary_text"),
                created_at: DateTime::<Utc>::from_timestamp(created_at, 0).unwrap_or_default(),
            }
        }))
    }

    async fn get_publication_for_file(&self, file_id: i64) -> Result<Option<PublicationInfo>> {
        let row = sqlx::query(
            "SELECT p.id, p.dof_date, p.type \
             FROM files f JOIN publications p ON f.publication_id = p.id \
             WHERE f.id = ?",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| PublicationInfo {
            id: row.get("id"),
            date: row.get("dof_date"),
            publication_type: row.get("type"),
        }))
    }
}

/// In-memory [`MetadataGateway`] for tests and embedding.
#[derive(Default)]
pub struct InMemoryGateway {
    files: RwLock<HashMap<i64, FileRecord>>,
    publications: RwLock<HashMap<i64, PublicationInfo>>,
    summaries: RwLock<Vec<SummaryRecord>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_publication(&self, publication: PublicationInfo) {
        self.publications
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(publication.id, publication);
    }

    pub fn insert_file(&self, file: FileRecord) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file.id, file);
    }

    pub fn insert_summary(&self, summary: SummaryRecord) {
        self.summaries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(summary);
    }
}

fn poisoned<T>(_: PoisonError<T>) -> anyhow::Error {
    anyhow::anyhow!("in-memory gateway lock poisoned")
}

#[async_trait]
impl MetadataGateway for InMemoryGateway {
    async fn get_file_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        Ok(self.files.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn get_latest_summary(
        &self,
        object_type: ObjectType,
        object_id: i64,
    ) -> Result<Option<SummaryRecord>> {
        let summaries = self.summaries.read().map_err(poisoned)?;
        // Later insertions win ties, matching the id tiebreak in SQLite.
        Ok(summaries
            .iter()
            .enumerate()
            .filter(|(_, s)| s.object_type == object_type && s.object_id == object_id)
            .max_by_key(|(idx, s)| (s.created_at, *idx))
            .map(|(_, s)| s.clone()))
    }

    async fn get_publication_for_file(&self, file_id: i64) -> Result<Option<PublicationInfo>> {
        let publication_id = match self.files.read().map_err(poisoned)?.get(&file_id) {
            Some(file) => file.publication_id,
            None => return Ok(None),
        };
        Ok(self
            .publications
            .read()
            .map_err(poisoned)?
            .get(&publication_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(object_type: ObjectType, object_id: i64, text: &str, ts: i64) -> SummaryRecord {
        SummaryRecord {
            object_type,
            object_id,
            text: text.to_string(),
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn in_memory_latest_summary_wins() {
        let gw = InMemoryGateway::new();
        gw.insert_summary(summary(ObjectType::Publication, 1, "old", 100));
        gw.insert_summary(summary(ObjectType::Publication, 1, "new", 200));
        gw.insert_summary(summary(ObjectType::Item, 1, "item", 300));
        gw.insert_summary(summary(ObjectType::Publication, 2, "other", 400));

        let latest = gw
            .get_latest_summary(ObjectType::Publication, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.text, "new");

        assert!(gw
            .get_latest_summary(ObjectType::Publication, 9)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn in_memory_publication_follows_file() {
        let gw = InMemoryGateway::new();
        gw.insert_publication(PublicationInfo {
            id: 3,
            date: "2025-11-06".to_string(),
            publication_type: "DOF".to_string(),
        });
        gw.insert_file(FileRecord {
            id: 7,
            publication_id: 3,
            primary_location: "/tmp/x.pdf".to_string(),
            public_location: None,
            mime_type: None,
            byte_size: None,
            content_hash: None,
        });

        let publication = gw.get_publication_for_file(7).await.unwrap().unwrap();
        assert_eq!(publication.id, 3);
        assert!(gw.get_publication_for_file(8).await.unwrap().is_none());
        assert!(gw.get_file_by_id(8).await.unwrap().is_none());
    }
}
