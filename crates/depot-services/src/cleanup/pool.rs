//! Bounded background deletion pool.
//!
//! Best-effort cleanup (duplicate local copies, staging directories,
//! remote objects of fully-unlinked files) runs off the request path.
//! Concurrency is capped by a semaphore rather than spawning unbounded
//! detached tasks; failures are logged and never observable to the client.

use depot_storage::RemoteStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;

#[derive(Clone)]
pub struct DeletionPool {
    semaphore: Arc<Semaphore>,
}

impl DeletionPool {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Delete a local file. Missing files are not an error.
    pub fn remove_file(&self, path: PathBuf) {
        let semaphore = self.semaphore.clone();
        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            match fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "Deleted local file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "Failed to delete local file");
                }
            }
        });
    }

    /// Delete a staging directory tree.
    pub fn remove_dir(&self, path: PathBuf) {
        let semaphore = self.semaphore.clone();
        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            match fs::remove_dir_all(&path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed staging directory"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "Failed to remove staging directory");
                }
            }
        });
    }

    /// Delete a remote object (after the last link to its file is gone).
    pub fn remove_remote(&self, store: Arc<dyn RemoteStore>, object_key: String) {
        let semaphore = self.semaphore.clone();
        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            match store.delete(&object_key).await {
                Ok(()) => tracing::debug!(key = %object_key, "Deleted remote object"),
                Err(e) => {
                    tracing::warn!(error = %e, key = %object_key, "Failed to delete remote object");
                }
            }
        });
    }
}
