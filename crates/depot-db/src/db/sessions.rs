//! Postgres-backed upload session store.
//!
//! The shared production implementation of `SessionStore`: session state
//! survives process restarts and is visible to every API instance, so chunks
//! of one upload can land on different nodes.

use async_trait::async_trait;
use depot_core::models::ChunkSession;
use depot_session::{SessionStore, SessionStoreError, SessionStoreResult};
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(err: sqlx::Error) -> SessionStoreError {
    SessionStoreError::Unavailable(err.to_string())
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn record_chunk_info(
        &self,
        upload_id: &str,
        file_name: &str,
        total_chunks: i32,
    ) -> SessionStoreResult<()> {
        sqlx::query(
            "INSERT INTO upload_sessions (upload_id, file_name, total_chunks) \
             VALUES ($1, $2, $3) ON CONFLICT (upload_id) DO NOTHING",
        )
        .bind(upload_id)
        .bind(file_name)
        .bind(total_chunks)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn mark_chunk_received(
        &self,
        upload_id: &str,
        chunk_index: i32,
    ) -> SessionStoreResult<()> {
        sqlx::query(
            "INSERT INTO upload_session_chunks (upload_id, chunk_index) \
             VALUES ($1, $2) ON CONFLICT (upload_id, chunk_index) DO NOTHING",
        )
        .bind(upload_id)
        .bind(chunk_index)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let foreign_key = e
                .as_database_error()
                .map(|d| d.kind() == sqlx::error::ErrorKind::ForeignKeyViolation)
                .unwrap_or(false);
            if foreign_key {
                SessionStoreError::NotFound(upload_id.to_string())
            } else {
                store_err(e)
            }
        })?;

        Ok(())
    }

    async fn get_session(&self, upload_id: &str) -> SessionStoreResult<Option<ChunkSession>> {
        let session_row =
            sqlx::query("SELECT file_name, total_chunks FROM upload_sessions WHERE upload_id = $1")
                .bind(upload_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;

        let Some(session_row) = session_row else {
            return Ok(None);
        };

        let chunk_rows = sqlx::query(
            "SELECT chunk_index FROM upload_session_chunks WHERE upload_id = $1 ORDER BY chunk_index",
        )
        .bind(upload_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let received: BTreeSet<i32> = chunk_rows
            .iter()
            .map(|row| row.get::<i32, _>("chunk_index"))
            .collect();

        Ok(Some(ChunkSession {
            upload_id: upload_id.to_string(),
            file_name: session_row.get("file_name"),
            total_chunks: session_row.get("total_chunks"),
            received,
        }))
    }

    async fn remove_session(&self, upload_id: &str) -> SessionStoreResult<()> {
        // Chunk rows cascade with the session row.
        sqlx::query("DELETE FROM upload_sessions WHERE upload_id = $1")
            .bind(upload_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(())
    }

    async fn remove_stale(&self, older_than: Duration) -> SessionStoreResult<Vec<String>> {
        let rows = sqlx::query(
            "DELETE FROM upload_sessions \
             WHERE created_at < now() - make_interval(secs => $1) RETURNING upload_id",
        )
        .bind(older_than.as_secs_f64())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("upload_id"))
            .collect())
    }
}
