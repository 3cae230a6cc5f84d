//! Core data models shared by the metadata gateway and the export pipeline.
//!
//! [`FileRecord`] and [`SummaryRecord`] mirror rows of the metadata store and
//! are read-only from the point of view of the download path.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One physical document and where to fetch its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub publication_id: i64,
    /// Scheme-tagged location: `http(s)://…`, `s3://…`, or a filesystem path.
    pub primary_location: String,
    /// Public mirror of the same bytes, preferred when it is HTTP.
    pub public_location: Option<String>,
    pub mime_type: Option<String>,
    pub byte_size: Option<i64>,
    pub content_hash: Option<String>,
}

/// Kind of object a summary describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Publication,
    Item,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Publication => "publication",
            ObjectType::Item => "item",
        }
    }
}

/// Generated summary text. The most recently created one per object wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub object_type: ObjectType,
    pub object_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Publication fields needed to name a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicationInfo {
    pub id: i64,
    /// Gazette date as stored (`YYYY-MM-DD`).
    pub date: String,
    pub publication_type: String,
}
