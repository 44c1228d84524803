//! Remote store abstraction trait

use async_trait::async_trait;
use depot_core::RemoteBackend;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Remote store operation errors
#[derive(Debug, Error)]
pub enum RemoteStoreError {
    #[error("Put failed: {0}")]
    PutFailed(String),

    #[error("Get failed: {0}")]
    GetFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Remote store backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for remote store operations
pub type RemoteStoreResult<T> = Result<T, RemoteStoreError>;

/// Narrow contract against the remote object store.
///
/// `put` overwrites by key, which is what makes at-least-once delivery from
/// the transfer queue safe. The bucket is fixed per backend instance; callers
/// only ever see object keys.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload a local file under the given object key (overwrite-by-key).
    async fn put(&self, object_key: &str, local_path: &Path) -> RemoteStoreResult<()>;

    /// Download an object to a local destination path.
    async fn get(&self, object_key: &str, dest_path: &Path) -> RemoteStoreResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, object_key: &str) -> RemoteStoreResult<()>;

    /// Generate a presigned/temporary GET URL for direct client access.
    async fn presigned_get_url(
        &self,
        object_key: &str,
        expires_in: Duration,
    ) -> RemoteStoreResult<String>;

    /// Check if an object exists.
    async fn exists(&self, object_key: &str) -> RemoteStoreResult<bool>;

    /// Get the backend type
    fn backend_type(&self) -> RemoteBackend;
}
