use async_trait::async_trait;
use sqlx::{
    Row,
    sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
        SqliteSynchronous,
    },
};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use super::artifact_store::{ArtifactStore, ArtifactStoreError};
use crate::artifacts::PersistedArtifact;

pub struct SqliteArtifactStore {
    pool: SqlitePool,
}

impl SqliteArtifactStore {
    pub async fn new(path: &Path) -> Result<Self, ArtifactStoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ArtifactStoreError::connection(format!("Failed to create directory: {e}"))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(|e| ArtifactStoreError::connection(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        Self::connect(options).await
    }

    pub async fn new_in_memory() -> Result<Self, ArtifactStoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| ArtifactStoreError::connection(format!("Invalid SQLite path: {e}")))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self, ArtifactStoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                ArtifactStoreError::connection(format!("Failed to connect to SQLite: {e}"))
            })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), ArtifactStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS message_artifacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id TEXT NOT NULL UNIQUE,
                chat_id TEXT NOT NULL,
                html_content TEXT,
                saved_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ArtifactStoreError::Migration {
            message: format!("Failed to create artifacts table: {e}"),
        })?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_message_artifacts_chat
            ON message_artifacts(chat_id, id)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ArtifactStoreError::Migration {
            message: format!("Failed to create index: {e}"),
        })?;

        Ok(())
    }

    fn record_from_row(row: &SqliteRow) -> PersistedArtifact {
        PersistedArtifact {
            message_id: row.get("message_id"),
            chat_id: row.get("chat_id"),
            html_content: row.get("html_content"),
        }
    }
}

#[async_trait]
impl ArtifactStore for SqliteArtifactStore {
    async fn save(&self, record: &PersistedArtifact) -> Result<(), ArtifactStoreError> {
        let saved_at = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO message_artifacts (message_id, chat_id, html_content, saved_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(message_id) DO UPDATE SET
                chat_id = excluded.chat_id,
                html_content = excluded.html_content,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(&record.message_id)
        .bind(&record.chat_id)
        .bind(record.html_content.as_deref())
        .bind(&saved_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ArtifactStoreError::database(format!("Failed to save artifacts: {e}")))?;

        debug!(
            target: "prism::store",
            message_id = %record.message_id,
            has_content = record.html_content.is_some(),
            "Saved message artifacts"
        );
        Ok(())
    }

    async fn load(&self, message_id: &str) -> Result<Option<PersistedArtifact>, ArtifactStoreError> {
        let row = sqlx::query(
            "SELECT message_id, chat_id, html_content FROM message_artifacts WHERE message_id = ?1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ArtifactStoreError::database(format!("Failed to load artifacts: {e}")))?;

        Ok(row.as_ref().map(Self::record_from_row))
    }

    async fn list_for_chat(
        &self,
        chat_id: &str,
    ) -> Result<Vec<PersistedArtifact>, ArtifactStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT message_id, chat_id, html_content
            FROM message_artifacts
            WHERE chat_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ArtifactStoreError::database(format!("Failed to list artifacts: {e}")))?;

        Ok(rows.iter().map(Self::record_from_row).collect())
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<u64, ArtifactStoreError> {
        let result = sqlx::query("DELETE FROM message_artifacts WHERE chat_id = ?1")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                ArtifactStoreError::database(format!("Failed to delete artifacts: {e}"))
            })?;

        Ok(result.rows_affected())
    }
}
