//! In-process session store
//!
//! Suitable for tests and single-process deployments. Production multi-node
//! deployments use the shared Postgres-backed implementation in `depot-db`.

use crate::store::{SessionStore, SessionStoreError, SessionStoreResult};
use async_trait::async_trait;
use depot_core::models::ChunkSession;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct SessionEntry {
    file_name: String,
    total_chunks: i32,
    received: BTreeSet<i32>,
    created_at: Instant,
}

/// Session store backed by a process-local map.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn record_chunk_info(
        &self,
        upload_id: &str,
        file_name: &str,
        total_chunks: i32,
    ) -> SessionStoreResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(upload_id.to_string())
            .or_insert_with(|| SessionEntry {
                file_name: file_name.to_string(),
                total_chunks,
                received: BTreeSet::new(),
                created_at: Instant::now(),
            });
        Ok(())
    }

    async fn mark_chunk_received(
        &self,
        upload_id: &str,
        chunk_index: i32,
    ) -> SessionStoreResult<()> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(upload_id)
            .ok_or_else(|| SessionStoreError::NotFound(upload_id.to_string()))?;
        entry.received.insert(chunk_index);
        Ok(())
    }

    async fn get_session(&self, upload_id: &str) -> SessionStoreResult<Option<ChunkSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(upload_id).map(|entry| ChunkSession {
            upload_id: upload_id.to_string(),
            file_name: entry.file_name.clone(),
            total_chunks: entry.total_chunks,
            received: entry.received.clone(),
        }))
    }

    async fn remove_session(&self, upload_id: &str) -> SessionStoreResult<()> {
        self.sessions.write().await.remove(upload_id);
        Ok(())
    }

    async fn remove_stale(&self, older_than: Duration) -> SessionStoreResult<Vec<String>> {
        let mut sessions = self.sessions.write().await;
        let stale: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| entry.created_at.elapsed() >= older_than)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            sessions.remove(id);
        }
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_chunk_info_is_idempotent() {
        let store = InMemorySessionStore::new();
        store.record_chunk_info("u1", "a.bin", 3).await.unwrap();
        store.mark_chunk_received("u1", 0).await.unwrap();

        // A concurrent chunk request re-registering metadata must not reset state.
        store.record_chunk_info("u1", "a.bin", 3).await.unwrap();

        let session = store.get_session("u1").await.unwrap().unwrap();
        assert_eq!(session.received_count(), 1);
        assert_eq!(session.total_chunks, 3);
    }

    #[tokio::test]
    async fn repeated_chunk_marks_are_harmless() {
        let store = InMemorySessionStore::new();
        store.record_chunk_info("u1", "a.bin", 2).await.unwrap();
        store.mark_chunk_received("u1", 1).await.unwrap();
        store.mark_chunk_received("u1", 1).await.unwrap();

        let session = store.get_session("u1").await.unwrap().unwrap();
        assert_eq!(session.received_count(), 1);
        assert!(!session.is_complete());
    }

    #[tokio::test]
    async fn mark_without_session_is_not_found() {
        let store = InMemorySessionStore::new();
        let err = store.mark_chunk_received("ghost", 0).await.unwrap_err();
        assert!(matches!(err, SessionStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn completeness_reached_out_of_order() {
        let store = InMemorySessionStore::new();
        store.record_chunk_info("u1", "a.bin", 3).await.unwrap();
        for index in [2, 0, 1] {
            store.mark_chunk_received("u1", index).await.unwrap();
        }

        let session = store.get_session("u1").await.unwrap().unwrap();
        assert!(session.is_complete());
    }

    #[tokio::test]
    async fn remove_session_discards_state() {
        let store = InMemorySessionStore::new();
        store.record_chunk_info("u1", "a.bin", 1).await.unwrap();
        store.remove_session("u1").await.unwrap();
        assert!(store.get_session("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_stale_returns_reclaimed_ids() {
        let store = InMemorySessionStore::new();
        store.record_chunk_info("old", "a.bin", 1).await.unwrap();

        let removed = store.remove_stale(Duration::ZERO).await.unwrap();
        assert_eq!(removed, vec!["old".to_string()]);
        assert!(store.get_session("old").await.unwrap().is_none());

        store.record_chunk_info("fresh", "b.bin", 1).await.unwrap();
        let removed = store
            .remove_stale(Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(removed.is_empty());
    }
}
