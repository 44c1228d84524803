//! Local directory setup for the file store and chunk staging area.

use anyhow::{Context, Result};
use depot_core::Config;
use tokio::fs;

pub async fn ensure_local_dirs(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.file_store_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create file store directory {}",
                config.file_store_dir.display()
            )
        })?;

    fs::create_dir_all(&config.chunk_staging_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create chunk staging directory {}",
                config.chunk_staging_dir.display()
            )
        })?;

    tracing::info!(
        file_store_dir = %config.file_store_dir.display(),
        chunk_staging_dir = %config.chunk_staging_dir.display(),
        "Local storage directories ready"
    );

    Ok(())
}
