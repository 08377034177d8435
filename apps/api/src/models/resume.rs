use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An uploaded resume document. The bytes live in S3 under `s3_key`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub s3_key: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}
