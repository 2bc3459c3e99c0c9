use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::artifacts::PersistedArtifact;

#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Migration error: {message}")]
    Migration { message: String },

    #[error("In-memory store lock poisoned: {message}")]
    LockPoisoned { message: String },
}

impl ArtifactStoreError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn lock_poisoned(message: impl Into<String>) -> Self {
        Self::LockPoisoned {
            message: message.into(),
        }
    }
}

/// Durable storage for per-message artifact content, keyed by message id.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Inserts or replaces the record for `record.message_id`.
    async fn save(&self, record: &PersistedArtifact) -> Result<(), ArtifactStoreError>;

    async fn load(&self, message_id: &str) -> Result<Option<PersistedArtifact>, ArtifactStoreError>;

    /// Records of a chat in the order they were first saved.
    async fn list_for_chat(&self, chat_id: &str)
    -> Result<Vec<PersistedArtifact>, ArtifactStoreError>;

    /// Removes every record of a chat. Returns how many were removed.
    async fn delete_chat(&self, chat_id: &str) -> Result<u64, ArtifactStoreError>;
}

pub struct InMemoryArtifactStore {
    records: std::sync::RwLock<HashMap<String, (u64, PersistedArtifact)>>,
    next_seq: std::sync::atomic::AtomicU64,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self {
            records: std::sync::RwLock::new(HashMap::new()),
            next_seq: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn save(&self, record: &PersistedArtifact) -> Result<(), ArtifactStoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| ArtifactStoreError::lock_poisoned("records"))?;

        let seq = match records.get(&record.message_id) {
            Some((seq, _)) => *seq,
            None => self
                .next_seq
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst),
        };
        records.insert(record.message_id.clone(), (seq, record.clone()));
        Ok(())
    }

    async fn load(&self, message_id: &str) -> Result<Option<PersistedArtifact>, ArtifactStoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| ArtifactStoreError::lock_poisoned("records"))?;
        Ok(records.get(message_id).map(|(_, record)| record.clone()))
    }

    async fn list_for_chat(
        &self,
        chat_id: &str,
    ) -> Result<Vec<PersistedArtifact>, ArtifactStoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| ArtifactStoreError::lock_poisoned("records"))?;
        let mut matching: Vec<_> = records
            .values()
            .filter(|(_, record)| record.chat_id == chat_id)
            .cloned()
            .collect();
        matching.sort_by_key(|(seq, _)| *seq);
        Ok(matching.into_iter().map(|(_, record)| record).collect())
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<u64, ArtifactStoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| ArtifactStoreError::lock_poisoned("records"))?;
        let before = records.len();
        records.retain(|_, (_, record)| record.chat_id != chat_id);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(message_id: &str, chat_id: &str, content: Option<&str>) -> PersistedArtifact {
        PersistedArtifact {
            message_id: message_id.to_string(),
            chat_id: chat_id.to_string(),
            html_content: content.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_in_memory_store_save_and_load() {
        let store = InMemoryArtifactStore::new();
        let saved = record("m1", "c1", Some("<div/>"));

        store.save(&saved).await.unwrap();

        assert_eq!(store.load("m1").await.unwrap(), Some(saved));
        assert_eq!(store.load("m2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_store_save_replaces_and_keeps_order() {
        let store = InMemoryArtifactStore::new();
        store.save(&record("m1", "c1", None)).await.unwrap();
        store.save(&record("m2", "c1", Some("<b/>"))).await.unwrap();
        store.save(&record("m1", "c1", Some("<a/>"))).await.unwrap();

        let listed = store.list_for_chat("c1").await.unwrap();
        assert_eq!(
            listed,
            vec![record("m1", "c1", Some("<a/>")), record("m2", "c1", Some("<b/>"))]
        );
    }

    #[tokio::test]
    async fn test_in_memory_store_chat_isolation_and_delete() {
        let store = InMemoryArtifactStore::new();
        store.save(&record("m1", "c1", Some("<a/>"))).await.unwrap();
        store.save(&record("m2", "c2", Some("<b/>"))).await.unwrap();

        assert_eq!(store.delete_chat("c1").await.unwrap(), 1);
        assert!(store.list_for_chat("c1").await.unwrap().is_empty());
        assert_eq!(store.list_for_chat("c2").await.unwrap().len(), 1);
    }
}
