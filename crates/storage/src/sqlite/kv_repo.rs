use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use vocab_core::model::{EngineSnapshot, ProgressCounters};

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{ProgressRepository, SnapshotRepository, StorageError};

const SNAPSHOT_KEY: &str = "engine_snapshot";
const PROGRESS_KEY: &str = "progress_counters";

impl SqliteRepository {
    async fn get_blob<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let value: String = row.try_get("value").map_err(ser)?;
        Ok(Some(serde_json::from_str(&value)?))
    }

    async fn put_blob<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let blob = serde_json::to_string(value)?;
        sqlx::query(
            r"
                INSERT INTO kv_store (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(blob)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        tracing::debug!(key, "stored blob");
        Ok(())
    }
}

#[async_trait::async_trait]
impl SnapshotRepository for SqliteRepository {
    async fn load_snapshot(&self) -> Result<Option<EngineSnapshot>, StorageError> {
        self.get_blob(SNAPSHOT_KEY).await
    }

    async fn save_snapshot(&self, snapshot: &EngineSnapshot) -> Result<(), StorageError> {
        self.put_blob(SNAPSHOT_KEY, snapshot).await
    }
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_counters(&self) -> Result<ProgressCounters, StorageError> {
        Ok(self.get_blob(PROGRESS_KEY).await?.unwrap_or_default())
    }

    async fn save_counters(&self, counters: &ProgressCounters) -> Result<(), StorageError> {
        self.put_blob(PROGRESS_KEY, counters).await
    }
}
