//! Upload session store trait

use async_trait::async_trait;
use depot_core::models::ChunkSession;
use depot_core::AppError;
use std::time::Duration;
use thiserror::Error;

/// Session store operation errors
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// The backing store could not be reached. Retryable; the triggering
    /// request fails rather than silently dropping a chunk-received record.
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    #[error("Upload session not found: {0}")]
    NotFound(String),

    #[error("Session store backend error: {0}")]
    Backend(String),
}

pub type SessionStoreResult<T> = Result<T, SessionStoreError>;

impl From<SessionStoreError> for AppError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::NotFound(id) => {
                AppError::NotFound(format!("Upload session not found: {}", id))
            }
            other => AppError::SessionStore(other.to_string()),
        }
    }
}

/// Shared per-upload chunk bookkeeping.
///
/// Chunks of one upload may arrive concurrently over separate connections, so
/// every operation here must be safe under concurrent calls for the same
/// upload id: metadata registration is idempotent and the received set is
/// naturally idempotent under repeated inserts.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Register session metadata. A no-op when the session already exists;
    /// each chunk request independently attempts this.
    async fn record_chunk_info(
        &self,
        upload_id: &str,
        file_name: &str,
        total_chunks: i32,
    ) -> SessionStoreResult<()>;

    /// Add a chunk index to the session's received set.
    async fn mark_chunk_received(&self, upload_id: &str, chunk_index: i32)
        -> SessionStoreResult<()>;

    async fn get_session(&self, upload_id: &str) -> SessionStoreResult<Option<ChunkSession>>;

    /// Drop a session after a successful merge.
    async fn remove_session(&self, upload_id: &str) -> SessionStoreResult<()>;

    /// Remove sessions older than the given age and return their upload ids
    /// so the caller can reclaim the matching staging directories.
    async fn remove_stale(&self, older_than: Duration) -> SessionStoreResult<Vec<String>>;
}
