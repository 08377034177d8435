//! Run status store: last-write-wins status per generation run, expiring after a TTL.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const KEY_PREFIX: &str = "folio:site-status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Processing,
    Completed,
    Error,
    NotFound,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Processing => write!(f, "processing"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Error => write!(f, "error"),
            RunStatus::NotFound => write!(f, "not_found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: RunStatus,
    pub message: String,
}

impl StatusReport {
    pub fn new(status: RunStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn processing() -> Self {
        Self::new(RunStatus::Processing, "Generating your portfolio...")
    }

    pub fn completed() -> Self {
        Self::new(RunStatus::Completed, "Portfolio generated successfully")
    }

    pub fn not_found() -> Self {
        Self::new(RunStatus::NotFound, "Portfolio not found")
    }
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Status encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Statuses are scoped to the owning user; a lookup under another user finds nothing.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Overwrites the status of a run and restarts its expiry.
    async fn set(
        &self,
        owner: Uuid,
        run_id: Uuid,
        report: StatusReport,
    ) -> Result<(), StatusError>;

    /// The last status written, unless it has expired.
    async fn get(&self, owner: Uuid, run_id: Uuid) -> Result<Option<StatusReport>, StatusError>;
}

fn status_key(owner: Uuid, run_id: Uuid) -> String {
    format!("{KEY_PREFIX}:{owner}:{run_id}")
}

/// Redis-backed store; entries expire via `SET ... EX`.
#[derive(Clone)]
pub struct RedisStatusStore {
    conn: redis::aio::MultiplexedConnection,
    ttl: Duration,
}

impl RedisStatusStore {
    pub async fn connect(client: &redis::Client, ttl: Duration) -> Result<Self, StatusError> {
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn, ttl })
    }
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    async fn set(
        &self,
        owner: Uuid,
        run_id: Uuid,
        report: StatusReport,
    ) -> Result<(), StatusError> {
        let payload = serde_json::to_string(&report)?;
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(status_key(owner, run_id))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, owner: Uuid, run_id: Uuid) -> Result<Option<StatusReport>, StatusError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = redis::cmd("GET")
            .arg(status_key(owner, run_id))
            .query_async(&mut conn)
            .await?;
        payload
            .map(|p| serde_json::from_str(&p))
            .transpose()
            .map_err(StatusError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use tokio::sync::Mutex;
    use tokio::time::Instant;

    /// In-process store with the same expiry semantics.
    struct MemoryStatusStore {
        entries: Mutex<HashMap<(Uuid, Uuid), (StatusReport, Instant)>>,
        ttl: Duration,
    }

    impl MemoryStatusStore {
        fn new(ttl: Duration) -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
                ttl,
            }
        }
    }

    #[async_trait]
    impl StatusStore for MemoryStatusStore {
        async fn set(
            &self,
            owner: Uuid,
            run_id: Uuid,
            report: StatusReport,
        ) -> Result<(), StatusError> {
            let mut entries = self.entries.lock().await;
            let now = Instant::now();
            entries.retain(|_, (_, expires_at)| *expires_at > now);
            entries.insert((owner, run_id), (report, now + self.ttl));
            Ok(())
        }

        async fn get(&self, owner: Uuid, run_id: Uuid) -> Result<Option<StatusReport>, StatusError> {
            let entries = self.entries.lock().await;
            Ok(entries
                .get(&(owner, run_id))
                .filter(|(_, expires_at)| *expires_at > Instant::now())
                .map(|(report, _)| report.clone()))
        }
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&StatusReport::not_found()).unwrap();
        assert_eq!(
            json,
            r#"{"status":"not_found","message":"Portfolio not found"}"#
        );
        assert_eq!(RunStatus::Processing.to_string(), "processing");
    }

    #[test]
    fn test_status_key_is_namespaced() {
        let id = Uuid::nil();
        assert_eq!(
            status_key(id, id),
            "folio:site-status:00000000-0000-0000-0000-000000000000:\
             00000000-0000-0000-0000-000000000000"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_last_write_wins_and_expires() {
        let store = MemoryStatusStore::new(Duration::from_secs(60));
        let (owner, run) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(store.get(owner, run).await.unwrap(), None);

        store.set(owner, run, StatusReport::processing()).await.unwrap();
        store.set(owner, run, StatusReport::completed()).await.unwrap();
        assert_eq!(
            store.get(owner, run).await.unwrap().map(|r| r.status),
            Some(RunStatus::Completed)
        );

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.get(owner, run).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewrite_restarts_expiry() {
        let store = MemoryStatusStore::new(Duration::from_secs(60));
        let (owner, run) = (Uuid::new_v4(), Uuid::new_v4());

        store.set(owner, run, StatusReport::processing()).await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        store
            .set(owner, run, StatusReport::new(RunStatus::Error, "boom"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;

        let report = store.get(owner, run).await.unwrap().unwrap();
        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(report.message, "boom");
    }

    #[tokio::test]
    async fn test_status_is_invisible_to_other_users() {
        let store = MemoryStatusStore::new(Duration::from_secs(60));
        let (owner, stranger, run) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store
            .set(owner, run, StatusReport::new(RunStatus::Error, "quota exceeded"))
            .await
            .unwrap();

        assert_eq!(store.get(stranger, run).await.unwrap(), None);
        assert!(store.get(owner, run).await.unwrap().is_some());
    }
}
