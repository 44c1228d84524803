//! File index repository: content-addressed records and reference-counted
//! user links.

use async_trait::async_trait;
use depot_core::models::{FileStatus, LinkOutcome, StoredFile, UnlinkOutcome, UserFileLink};
use depot_core::{AppError, FileIndex};
use sqlx::{PgPool, Row};
use uuid::Uuid;

const FILE_COLUMNS: &str = "id, content_hash, display_name, size_bytes, storage_path, status, \
     reference_count, remote_object_key, created_at, updated_at";

/// Repository for the `files` and `user_files` tables.
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_hash(&self, content_hash: &str) -> Result<Option<StoredFile>, AppError> {
        let record = sqlx::query_as::<_, StoredFile>(&format!(
            "SELECT {} FROM files WHERE content_hash = $1",
            FILE_COLUMNS
        ))
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get(&self, file_id: Uuid) -> Result<Option<StoredFile>, AppError> {
        let record = sqlx::query_as::<_, StoredFile>(&format!(
            "SELECT {} FROM files WHERE id = $1",
            FILE_COLUMNS
        ))
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Register content under its hash, or return the existing record.
    ///
    /// Two concurrent uploads of identical content race here; the unique
    /// constraint on `content_hash` is the authority. The loser's insert
    /// affects no rows and it falls back to re-fetching the winner's record.
    /// A soft-deleted record (refcount zero, cleanup pending) is revived with
    /// the new local path since the old bytes may already be gone.
    pub async fn register_content(
        &self,
        content_hash: &str,
        display_name: &str,
        size_bytes: i64,
        storage_path: &str,
    ) -> Result<(StoredFile, bool), AppError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, StoredFile>(&format!(
            "SELECT {} FROM files WHERE content_hash = $1 FOR UPDATE",
            FILE_COLUMNS
        ))
        .bind(content_hash)
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some(record) if record.status != FileStatus::Deleted => {
                tx.commit().await?;
                Ok((record, false))
            }
            Some(record) => {
                let revived = sqlx::query_as::<_, StoredFile>(&format!(
                    "UPDATE files SET display_name = $2, size_bytes = $3, storage_path = $4, \
                     status = 'active', reference_count = 0, remote_object_key = NULL, \
                     updated_at = now() WHERE id = $1 RETURNING {}",
                    FILE_COLUMNS
                ))
                .bind(record.id)
                .bind(display_name)
                .bind(size_bytes)
                .bind(storage_path)
                .fetch_one(&mut *tx)
                .await?;
                tx.commit().await?;

                tracing::info!(file_id = %revived.id, content_hash = %content_hash, "Revived soft-deleted file record");
                Ok((revived, true))
            }
            None => {
                let inserted = sqlx::query_as::<_, StoredFile>(&format!(
                    "INSERT INTO files (id, content_hash, display_name, size_bytes, storage_path, status, reference_count) \
                     VALUES ($1, $2, $3, $4, $5, 'active', 0) \
                     ON CONFLICT (content_hash) DO NOTHING RETURNING {}",
                    FILE_COLUMNS
                ))
                .bind(Uuid::new_v4())
                .bind(content_hash)
                .bind(display_name)
                .bind(size_bytes)
                .bind(storage_path)
                .fetch_optional(&mut *tx)
                .await?;

                match inserted {
                    Some(record) => {
                        tx.commit().await?;
                        Ok((record, true))
                    }
                    None => {
                        // Lost the insert race: re-fetch the winner's row.
                        let record = sqlx::query_as::<_, StoredFile>(&format!(
                            "SELECT {} FROM files WHERE content_hash = $1",
                            FILE_COLUMNS
                        ))
                        .bind(content_hash)
                        .fetch_optional(&mut *tx)
                        .await?
                        .ok_or_else(|| {
                            AppError::Internal(format!(
                                "Insert conflict for hash {} but no record found",
                                content_hash
                            ))
                        })?;
                        tx.commit().await?;
                        Ok((record, false))
                    }
                }
            }
        }
    }

    pub async fn link_exists(&self, user_id: Uuid, file_id: Uuid) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT 1 AS present FROM user_files WHERE user_id = $1 AND file_id = $2",
        )
        .bind(user_id)
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Link a user to a file and increment the reference count in one
    /// transaction. Both mutations commit or neither does.
    pub async fn link(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        logical_name: &str,
    ) -> Result<LinkOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO user_files (user_id, file_id, logical_name) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, file_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(file_id)
        .bind(logical_name)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(LinkOutcome::Repeat);
        }

        sqlx::query(
            "UPDATE files SET reference_count = reference_count + 1, updated_at = now() \
             WHERE id = $1",
        )
        .bind(file_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, file_id = %file_id, "User linked to file");
        Ok(LinkOutcome::Linked)
    }

    /// Remove a user's link and decrement the reference count in one
    /// transaction, flooring at zero. At zero the record is soft-deleted in
    /// the same transaction; physical cleanup is the caller's follow-up.
    pub async fn unlink(&self, user_id: Uuid, file_id: Uuid) -> Result<UnlinkOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM user_files WHERE user_id = $1 AND file_id = $2")
            .bind(user_id)
            .bind(file_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!(
                "No link between user {} and file {}",
                user_id, file_id
            )));
        }

        let row = sqlx::query(
            "UPDATE files SET reference_count = GREATEST(reference_count - 1, 0), \
             updated_at = now() WHERE id = $1 \
             RETURNING reference_count, storage_path, remote_object_key",
        )
        .bind(file_id)
        .fetch_one(&mut *tx)
        .await?;

        let remaining_links: i32 = row.get("reference_count");
        let storage_path: String = row.get("storage_path");
        let remote_object_key: Option<String> = row.get("remote_object_key");

        if remaining_links == 0 {
            sqlx::query("UPDATE files SET status = 'deleted', updated_at = now() WHERE id = $1")
                .bind(file_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            file_id = %file_id,
            remaining_links,
            "User unlinked from file"
        );

        Ok(UnlinkOutcome {
            remaining_links,
            storage_path,
            remote_object_key,
        })
    }

    /// Record the remote object key once the transfer consumer has archived
    /// the file. A record deleted in the meantime is left alone.
    pub async fn mark_archived(
        &self,
        file_id: Uuid,
        remote_object_key: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE files SET status = 'archived', remote_object_key = $2, updated_at = now() \
             WHERE id = $1 AND status = 'active'",
        )
        .bind(file_id)
        .bind(remote_object_key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update mutable metadata. `None` fields keep their current value.
    pub async fn update_meta(
        &self,
        file_id: Uuid,
        display_name: Option<&str>,
        status: Option<FileStatus>,
    ) -> Result<StoredFile, AppError> {
        let record = sqlx::query_as::<_, StoredFile>(&format!(
            "UPDATE files SET display_name = COALESCE($2, display_name), \
             status = COALESCE($3, status), updated_at = now() \
             WHERE id = $1 RETURNING {}",
            FILE_COLUMNS
        ))
        .bind(file_id)
        .bind(display_name)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File not found: {}", file_id)))?;

        Ok(record)
    }

    pub async fn links_for_user(&self, user_id: Uuid) -> Result<Vec<UserFileLink>, AppError> {
        let links = sqlx::query_as::<_, UserFileLink>(
            "SELECT user_id, file_id, logical_name, status, linked_at \
             FROM user_files WHERE user_id = $1 ORDER BY linked_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }
}

#[async_trait]
impl FileIndex for FileRepository {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<StoredFile>, AppError> {
        FileRepository::find_by_hash(self, content_hash).await
    }

    async fn register_content(
        &self,
        content_hash: &str,
        display_name: &str,
        size_bytes: i64,
        storage_path: &str,
    ) -> Result<(StoredFile, bool), AppError> {
        FileRepository::register_content(self, content_hash, display_name, size_bytes, storage_path)
            .await
    }

    async fn link_exists(&self, user_id: Uuid, file_id: Uuid) -> Result<bool, AppError> {
        FileRepository::link_exists(self, user_id, file_id).await
    }

    async fn link(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        logical_name: &str,
    ) -> Result<LinkOutcome, AppError> {
        FileRepository::link(self, user_id, file_id, logical_name).await
    }

    async fn unlink(&self, user_id: Uuid, file_id: Uuid) -> Result<UnlinkOutcome, AppError> {
        FileRepository::unlink(self, user_id, file_id).await
    }

    async fn get(&self, file_id: Uuid) -> Result<Option<StoredFile>, AppError> {
        FileRepository::get(self, file_id).await
    }
}
