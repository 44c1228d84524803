//! Chunk assembly.
//!
//! Chunks arrive in any order but are always assembled in declared index
//! order, so the merged bytes are independent of arrival order.

use depot_core::AppError;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Path of one staged chunk inside an upload's staging directory.
pub fn staged_chunk_path(staging_dir: &Path, chunk_index: i32) -> PathBuf {
    staging_dir.join(format!("chunk-{}", chunk_index))
}

/// Concatenate staged chunks `0..total_chunks` into `dest` and return the
/// assembled size in bytes.
///
/// A missing or unreadable chunk aborts the merge naming its index; the
/// caller discards the partial destination file. Hash verification of the
/// assembled file is the caller's next step.
pub async fn assemble_chunks(
    staging_dir: &Path,
    total_chunks: i32,
    dest: &Path,
) -> Result<i64, AppError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut out = fs::File::create(dest)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", dest.display(), e)))?;

    let mut total_bytes = 0i64;

    for index in 0..total_chunks {
        let chunk_path = staged_chunk_path(staging_dir, index);

        let mut chunk = fs::File::open(&chunk_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::MissingChunk { index }
            } else {
                AppError::Storage(format!(
                    "Failed to read chunk {} at {}: {}",
                    index,
                    chunk_path.display(),
                    e
                ))
            }
        })?;

        let copied = tokio::io::copy(&mut chunk, &mut out).await.map_err(|e| {
            AppError::Storage(format!("Failed to append chunk {}: {}", index, e))
        })?;
        total_bytes += copied as i64;
    }

    out.sync_all()
        .await
        .map_err(|e| AppError::Storage(format!("Failed to sync {}: {}", dest.display(), e)))?;

    Ok(total_bytes)
}
