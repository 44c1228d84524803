//! Remote store factory: builds the configured backend.

use crate::traits::RemoteStore;
use anyhow::Result;
use depot_core::{Config, RemoteBackend};
use std::sync::Arc;

/// Create the remote store selected by configuration.
pub async fn create_remote_store(config: &Config) -> Result<Arc<dyn RemoteStore>> {
    match config.remote_backend {
        #[cfg(feature = "storage-s3")]
        RemoteBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| anyhow::anyhow!("S3_BUCKET must be set when REMOTE_BACKEND=s3"))?;
            let store = crate::s3::S3RemoteStore::new(
                bucket,
                config.s3_region.clone(),
                config.s3_endpoint.clone(),
            )
            .await?;
            tracing::info!(backend = "s3", "Remote store initialized");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-s3"))]
        RemoteBackend::S3 => {
            anyhow::bail!("REMOTE_BACKEND=s3 requires the 'storage-s3' feature")
        }
        #[cfg(feature = "storage-local")]
        RemoteBackend::Local => {
            let base_path = config.local_remote_dir.clone().ok_or_else(|| {
                anyhow::anyhow!("LOCAL_REMOTE_DIR must be set when REMOTE_BACKEND=local")
            })?;
            let base_url = format!("file://{}", base_path.display());
            let store = crate::local::LocalRemoteStore::new(base_path, base_url).await?;
            tracing::info!(backend = "local", "Remote store initialized");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-local"))]
        RemoteBackend::Local => {
            anyhow::bail!("REMOTE_BACKEND=local requires the 'storage-local' feature")
        }
    }
}
