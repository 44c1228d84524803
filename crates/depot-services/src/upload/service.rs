//! Upload orchestration: single-shot uploads, chunk receipt, merge, fast
//! upload, and unlink with conditional physical deletion.
//!
//! All collaborators come in through constructor injection so tests can
//! substitute in-memory fakes and lifecycle stays explicit.

use bytes::Bytes;
use depot_core::hash;
use depot_core::models::{LinkOutcome, TransferMessage, UnlinkOutcome};
use depot_core::{AppError, FileIndex, TransferProducer};
use depot_session::SessionStore;
use depot_storage::{object_key, RemoteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::cleanup::DeletionPool;
use crate::upload::merge::{assemble_chunks, staged_chunk_path};
use crate::upload::types::{ChunkReceipt, FastUploadOutcome, UploadOutcome};

pub struct UploadService {
    index: Arc<dyn FileIndex>,
    sessions: Arc<dyn SessionStore>,
    transfers: Arc<dyn TransferProducer>,
    remote: Arc<dyn RemoteStore>,
    deletions: DeletionPool,
    file_store_dir: PathBuf,
    chunk_staging_dir: PathBuf,
    remote_key_prefix: String,
}

impl UploadService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: Arc<dyn FileIndex>,
        sessions: Arc<dyn SessionStore>,
        transfers: Arc<dyn TransferProducer>,
        remote: Arc<dyn RemoteStore>,
        deletions: DeletionPool,
        file_store_dir: PathBuf,
        chunk_staging_dir: PathBuf,
        remote_key_prefix: String,
    ) -> Self {
        Self {
            index,
            sessions,
            transfers,
            remote,
            deletions,
            file_store_dir,
            chunk_staging_dir,
            remote_key_prefix,
        }
    }

    pub fn staging_dir_for(&self, upload_id: &str) -> PathBuf {
        self.chunk_staging_dir.join(upload_id)
    }

    /// Single-shot upload: write, verify against the declared hash, then
    /// register, dedup, and link.
    pub async fn store_file(
        &self,
        user_id: Uuid,
        declared_hash: &str,
        file_name: &str,
        data: Bytes,
    ) -> Result<UploadOutcome, AppError> {
        let declared_hash = validate_declared_hash(declared_hash)?;
        let file_name = sanitize_file_name(file_name)?;
        if data.is_empty() {
            return Err(AppError::InvalidInput("File is empty".to_string()));
        }

        let local_path = self.new_store_path(&file_name);
        let size_bytes = data.len() as i64;
        write_file(&local_path, &data).await?;

        // Re-read from disk so the digest covers exactly what was persisted.
        let computed = hash::hash_file(&local_path).await?;
        if computed != declared_hash {
            if let Err(e) = fs::remove_file(&local_path).await {
                tracing::warn!(
                    error = %e,
                    path = %local_path.display(),
                    "Failed to remove file after hash mismatch"
                );
            }
            return Err(AppError::HashMismatch {
                declared: declared_hash,
                computed,
            });
        }

        self.finalize(user_id, &computed, &file_name, size_bytes, &local_path)
            .await
    }

    /// Accept one chunk: verify its declared hash, stage the bytes, and
    /// record arrival in the session store.
    pub async fn receive_chunk(
        &self,
        upload_id: &str,
        chunk_index: i32,
        total_chunks: i32,
        declared_chunk_hash: &str,
        file_name: &str,
        data: Bytes,
    ) -> Result<ChunkReceipt, AppError> {
        validate_upload_id(upload_id)?;
        let file_name = sanitize_file_name(file_name)?;

        if total_chunks <= 0 {
            return Err(AppError::InvalidInput(
                "total_chunks must be greater than 0".to_string(),
            ));
        }
        if chunk_index < 0 || chunk_index >= total_chunks {
            return Err(AppError::InvalidInput(format!(
                "chunk_index {} out of range for {} chunks",
                chunk_index, total_chunks
            )));
        }

        // Corrupt chunks are rejected at receipt, not at merge time.
        let declared_chunk_hash = validate_declared_hash(declared_chunk_hash)?;
        let computed = hash::hash_bytes(&data);
        if computed != declared_chunk_hash {
            return Err(AppError::HashMismatch {
                declared: declared_chunk_hash,
                computed,
            });
        }

        let staging_dir = self.staging_dir_for(upload_id);
        write_file(&staged_chunk_path(&staging_dir, chunk_index), &data).await?;

        // Each chunk request registers metadata independently; the call is
        // idempotent under concurrent arrivals.
        self.sessions
            .record_chunk_info(upload_id, &file_name, total_chunks)
            .await?;

        let session = self
            .sessions
            .get_session(upload_id)
            .await?
            .ok_or_else(|| AppError::SessionStore("Session vanished after registration".into()))?;
        if session.total_chunks != total_chunks {
            return Err(AppError::InvalidInput(format!(
                "total_chunks mismatch: session declared {}, request declared {}",
                session.total_chunks, total_chunks
            )));
        }

        self.sessions
            .mark_chunk_received(upload_id, chunk_index)
            .await?;

        let session = self
            .sessions
            .get_session(upload_id)
            .await?
            .ok_or_else(|| AppError::SessionStore("Session vanished after chunk mark".into()))?;

        tracing::info!(
            upload_id = %upload_id,
            chunk_index,
            received = session.received_count(),
            total = session.total_chunks,
            "Chunk accepted"
        );

        Ok(ChunkReceipt {
            upload_id: upload_id.to_string(),
            chunk_index,
            received_chunks: session.received_count(),
            total_chunks: session.total_chunks,
        })
    }

    /// Merge a complete session into one file, verify it against the
    /// client-declared final hash, then register, dedup, and link.
    pub async fn merge_chunks(
        &self,
        upload_id: &str,
        user_id: Uuid,
        declared_hash: &str,
    ) -> Result<UploadOutcome, AppError> {
        validate_upload_id(upload_id)?;
        let declared_hash = validate_declared_hash(declared_hash)?;

        let session = self
            .sessions
            .get_session(upload_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload session not found: {}", upload_id)))?;

        if let Some(index) = session.first_missing() {
            return Err(AppError::MissingChunk { index });
        }

        let staging_dir = self.staging_dir_for(upload_id);
        let local_path = self.new_store_path(&session.file_name);

        let size_bytes = match assemble_chunks(&staging_dir, session.total_chunks, &local_path).await
        {
            Ok(size) => size,
            Err(e) => {
                fs::remove_file(&local_path).await.ok();
                return Err(e);
            }
        };

        let computed = hash::hash_file(&local_path).await?;
        if computed != declared_hash {
            // A mismatched merge is rejected outright; never leave partial
            // state reachable.
            if let Err(e) = fs::remove_file(&local_path).await {
                tracing::warn!(
                    error = %e,
                    path = %local_path.display(),
                    "Failed to remove merged file after hash mismatch"
                );
            }
            return Err(AppError::HashMismatch {
                declared: declared_hash,
                computed,
            });
        }

        let outcome = self
            .finalize(user_id, &computed, &session.file_name, size_bytes, &local_path)
            .await?;

        // Session and staging teardown is best-effort: the merged file is
        // already durable and correct.
        if let Err(e) = self.sessions.remove_session(upload_id).await {
            tracing::warn!(error = %e, upload_id = %upload_id, "Failed to remove upload session");
        }
        self.deletions.remove_dir(staging_dir);

        tracing::info!(
            upload_id = %upload_id,
            file_id = %outcome.file_id,
            size_bytes,
            chunks = session.total_chunks,
            "Chunked upload merged"
        );

        Ok(outcome)
    }

    /// Hash-only probe: link to existing content without uploading bytes.
    pub async fn fast_upload(
        &self,
        user_id: Uuid,
        declared_hash: &str,
        file_name: &str,
    ) -> Result<FastUploadOutcome, AppError> {
        let declared_hash = validate_declared_hash(declared_hash)?;
        let file_name = sanitize_file_name(file_name)?;

        let Some(record) = self.index.find_by_hash(&declared_hash).await? else {
            return Ok(FastUploadOutcome::NotExists);
        };

        if self.index.link_exists(user_id, record.id).await? {
            return Ok(FastUploadOutcome::Repeat { file_id: record.id });
        }

        match self.index.link(user_id, record.id, &file_name).await? {
            LinkOutcome::Linked => Ok(FastUploadOutcome::Linked { file_id: record.id }),
            // Raced another request from the same user; same answer.
            LinkOutcome::Repeat => Ok(FastUploadOutcome::Repeat { file_id: record.id }),
        }
    }

    /// Unlink a user from a file; when the last owner goes away, physical
    /// cleanup of the local copy and any remote object is dispatched to the
    /// deletion pool outside the transaction.
    pub async fn remove_file(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> Result<UnlinkOutcome, AppError> {
        let outcome = self.index.unlink(user_id, file_id).await?;

        if outcome.removed_last() {
            tracing::info!(
                file_id = %file_id,
                path = %outcome.storage_path,
                "Last link removed, scheduling physical deletion"
            );
            self.deletions
                .remove_file(PathBuf::from(&outcome.storage_path));
            if let Some(ref key) = outcome.remote_object_key {
                self.deletions
                    .remove_remote(self.remote.clone(), key.clone());
            }
        }

        Ok(outcome)
    }

    /// Register content, drop redundant duplicate bytes, link the user, and
    /// enqueue archival for newly created links.
    async fn finalize(
        &self,
        user_id: Uuid,
        content_hash: &str,
        file_name: &str,
        size_bytes: i64,
        local_path: &Path,
    ) -> Result<UploadOutcome, AppError> {
        let (record, created) = self
            .index
            .register_content(
                content_hash,
                file_name,
                size_bytes,
                &local_path.to_string_lossy(),
            )
            .await?;

        if !created {
            // The canonical copy already exists; the bytes just written are
            // redundant and deleted off the request path.
            tracing::info!(
                file_id = %record.id,
                content_hash = %content_hash,
                "Duplicate content detected, reusing canonical copy"
            );
            self.deletions.remove_file(local_path.to_path_buf());
        }

        let outcome = self.index.link(user_id, record.id, file_name).await?;

        if outcome == LinkOutcome::Linked {
            let message = TransferMessage {
                file_id: record.id,
                local_path: record.storage_path.clone(),
                remote_object_key: object_key(&self.remote_key_prefix, &record.display_name),
            };
            // Fire-and-forget relative to the response: the client is told
            // "accepted" whether or not archival gets queued this instant.
            if let Err(e) = self.transfers.publish(&message).await {
                tracing::warn!(
                    error = %e,
                    file_id = %record.id,
                    "Failed to enqueue transfer for archival"
                );
            }
        }

        Ok(UploadOutcome {
            file_id: record.id,
            outcome,
            deduplicated: !created,
        })
    }

    fn new_store_path(&self, file_name: &str) -> PathBuf {
        // Namespaced by a random id so concurrent uploads of same-named
        // files never collide on disk.
        self.file_store_dir
            .join(format!("{}_{}", Uuid::new_v4(), file_name))
    }
}

fn validate_declared_hash(declared: &str) -> Result<String, AppError> {
    if !hash::is_valid_digest(declared) {
        return Err(AppError::InvalidInput(format!(
            "Declared hash is not a hex SHA-256 digest: {}",
            declared
        )));
    }
    Ok(hash::normalize_digest(declared))
}

fn sanitize_file_name(name: &str) -> Result<String, AppError> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::InvalidInput("Invalid file name".to_string()));
    }
    Ok(name.to_string())
}

fn validate_upload_id(upload_id: &str) -> Result<(), AppError> {
    let ok = !upload_id.is_empty()
        && upload_id.len() <= 128
        && upload_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !ok {
        return Err(AppError::InvalidInput(format!(
            "upload_id must be alphanumeric with '-' or '_': {}",
            upload_id
        )));
    }
    Ok(())
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create directory: {}", e)))?;
    }

    let mut file = fs::File::create(path)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", path.display(), e)))?;
    file.write_all(data)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;
    file.sync_all()
        .await
        .map_err(|e| AppError::Storage(format!("Failed to sync {}: {}", path.display(), e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_file_name("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_file_name("dir\\name.txt").unwrap(), "name.txt");
        assert!(sanitize_file_name("").is_err());
        assert!(sanitize_file_name("..").is_err());
    }

    #[test]
    fn upload_id_validation() {
        assert!(validate_upload_id("abc-123_DEF").is_ok());
        assert!(validate_upload_id("").is_err());
        assert!(validate_upload_id("../escape").is_err());
        assert!(validate_upload_id("a/b").is_err());
    }

    #[test]
    fn declared_hash_is_normalized() {
        let upper = depot_core::hash::hash_bytes(b"x").to_uppercase();
        let normalized = validate_declared_hash(&upper).unwrap();
        assert_eq!(normalized, depot_core::hash::hash_bytes(b"x"));
        assert!(validate_declared_hash("nope").is_err());
    }
}
