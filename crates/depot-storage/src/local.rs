use crate::keys::validate_key;
use crate::traits::{RemoteStore, RemoteStoreError, RemoteStoreResult};
use async_trait::async_trait;
use depot_core::RemoteBackend;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Directory-backed remote store.
///
/// Stands in for the real object store in tests and single-machine
/// deployments; the key namespace maps directly onto a directory tree.
#[derive(Clone)]
pub struct LocalRemoteStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalRemoteStore {
    /// # Arguments
    /// * `base_path` - Root directory for stored objects
    /// * `base_url` - Base URL returned from presigned-URL requests
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> RemoteStoreResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            RemoteStoreError::ConfigError(format!(
                "Failed to create remote store directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalRemoteStore {
            base_path,
            base_url,
        })
    }

    fn key_to_path(&self, object_key: &str) -> RemoteStoreResult<PathBuf> {
        validate_key(object_key)?;
        Ok(self.base_path.join(object_key))
    }

    fn generate_url(&self, object_key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), object_key)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> RemoteStoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for LocalRemoteStore {
    async fn put(&self, object_key: &str, local_path: &Path) -> RemoteStoreResult<()> {
        let path = self.key_to_path(object_key)?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let bytes_copied = fs::copy(local_path, &path).await.map_err(|e| {
            RemoteStoreError::PutFailed(format!(
                "Failed to copy {} to {}: {}",
                local_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!(
            key = %object_key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local remote store put successful"
        );

        Ok(())
    }

    async fn get(&self, object_key: &str, dest_path: &Path) -> RemoteStoreResult<()> {
        let path = self.key_to_path(object_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(RemoteStoreError::NotFound(object_key.to_string()));
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::copy(&path, dest_path).await.map_err(|e| {
            RemoteStoreError::GetFailed(format!(
                "Failed to copy {} to {}: {}",
                path.display(),
                dest_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    async fn delete(&self, object_key: &str) -> RemoteStoreResult<()> {
        let path = self.key_to_path(object_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            RemoteStoreError::DeleteFailed(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::info!(key = %object_key, "Local remote store delete successful");

        Ok(())
    }

    async fn presigned_get_url(
        &self,
        object_key: &str,
        _expires_in: Duration,
    ) -> RemoteStoreResult<String> {
        self.key_to_path(object_key)?;
        Ok(self.generate_url(object_key))
    }

    async fn exists(&self, object_key: &str) -> RemoteStoreResult<bool> {
        let path = self.key_to_path(object_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> RemoteBackend {
        RemoteBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn store_with_dirs() -> (tempfile::TempDir, tempfile::TempDir, LocalRemoteStore) {
        let remote_dir = tempdir().unwrap();
        let work_dir = tempdir().unwrap();
        let store = LocalRemoteStore::new(
            remote_dir.path(),
            "http://localhost:9000/depot".to_string(),
        )
        .await
        .unwrap();
        (remote_dir, work_dir, store)
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let (_remote, work, store) = store_with_dirs().await;

        let src = work.path().join("src.bin");
        fs::write(&src, b"object bytes").await.unwrap();

        store.put("file-store/src.bin", &src).await.unwrap();
        assert!(store.exists("file-store/src.bin").await.unwrap());

        let dest = work.path().join("dest.bin");
        store.get("file-store/src.bin", &dest).await.unwrap();
        assert_eq!(fs::read(&dest).await.unwrap(), b"object bytes");
    }

    #[tokio::test]
    async fn put_overwrites_by_key() {
        let (_remote, work, store) = store_with_dirs().await;

        let first = work.path().join("v1.bin");
        let second = work.path().join("v2.bin");
        fs::write(&first, b"version one").await.unwrap();
        fs::write(&second, b"version two").await.unwrap();

        // Redelivered transfer messages replay the put; last write wins.
        store.put("file-store/report.pdf", &first).await.unwrap();
        store.put("file-store/report.pdf", &second).await.unwrap();

        let dest = work.path().join("out.bin");
        store.get("file-store/report.pdf", &dest).await.unwrap();
        assert_eq!(fs::read(&dest).await.unwrap(), b"version two");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_remote, work, store) = store_with_dirs().await;

        let src = work.path().join("src.bin");
        fs::write(&src, b"x").await.unwrap();
        store.put("file-store/x.bin", &src).await.unwrap();

        store.delete("file-store/x.bin").await.unwrap();
        assert!(!store.exists("file-store/x.bin").await.unwrap());
        store.delete("file-store/x.bin").await.unwrap();
    }

    #[tokio::test]
    async fn get_missing_object_is_not_found() {
        let (_remote, work, store) = store_with_dirs().await;
        let dest = work.path().join("dest.bin");
        let result = store.get("file-store/absent.bin", &dest).await;
        assert!(matches!(result, Err(RemoteStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn path_traversal_rejected() {
        let (_remote, work, store) = store_with_dirs().await;
        let src = work.path().join("src.bin");
        fs::write(&src, b"x").await.unwrap();

        let result = store.put("../escape.bin", &src).await;
        assert!(matches!(result, Err(RemoteStoreError::InvalidKey(_))));

        let result = store.exists("/etc/passwd").await;
        assert!(matches!(result, Err(RemoteStoreError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn presigned_url_points_at_key() {
        let (_remote, _work, store) = store_with_dirs().await;
        let url = store
            .presigned_get_url("file-store/report.pdf", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:9000/depot/file-store/report.pdf");
    }
}
