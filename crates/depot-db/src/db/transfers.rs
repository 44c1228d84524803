//! Durable transfer queue.
//!
//! Producers insert one row per finalized file and NOTIFY the consumer.
//! Claims use `FOR UPDATE SKIP LOCKED` so multiple consumers never double-pop
//! a row; delivery is at-least-once and the remote put is idempotent.

use async_trait::async_trait;
use depot_core::models::{TransferMessage, TransferTask};
use depot_core::{AppError, TransferProducer};
use sqlx::PgPool;
use uuid::Uuid;

/// Channel name for PostgreSQL LISTEN/NOTIFY when a transfer is enqueued.
pub const TRANSFER_NOTIFY_CHANNEL: &str = "depot_transfer";

const TASK_COLUMNS: &str =
    "id, file_id, local_path, remote_object_key, status, attempts, last_error, \
     available_at, created_at";

#[derive(Clone)]
pub struct TransferRepository {
    pool: PgPool,
}

impl TransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue one transfer and wake the consumer.
    pub async fn enqueue(&self, message: &TransferMessage) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO transfer_tasks (id, file_id, local_path, remote_object_key) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(message.file_id)
        .bind(&message.local_path)
        .bind(&message.remote_object_key)
        .execute(&self.pool)
        .await?;

        // Wake is best-effort; the consumer also polls.
        if let Err(e) = sqlx::query("SELECT pg_notify($1, $2)")
            .bind(TRANSFER_NOTIFY_CHANNEL)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
        {
            tracing::warn!(error = %e, transfer_id = %id, "Failed to notify transfer consumer");
        }

        tracing::info!(
            transfer_id = %id,
            file_id = %message.file_id,
            remote_object_key = %message.remote_object_key,
            "Transfer enqueued"
        );

        Ok(id)
    }

    /// Claim the next due transfer, incrementing its attempt counter.
    pub async fn claim_next(&self) -> Result<Option<TransferTask>, AppError> {
        let task = sqlx::query_as::<_, TransferTask>(&format!(
            "UPDATE transfer_tasks SET status = 'running', started_at = now(), \
             attempts = attempts + 1 \
             WHERE id = (SELECT id FROM transfer_tasks \
                         WHERE status = 'pending' AND available_at <= now() \
                         ORDER BY created_at LIMIT 1 FOR UPDATE SKIP LOCKED) \
             RETURNING {}",
            TASK_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    pub async fn mark_completed(&self, transfer_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE transfer_tasks SET status = 'completed', finished_at = now() WHERE id = $1",
        )
        .bind(transfer_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Put the task back in the queue after a failed attempt, due again after
    /// the backoff delay.
    pub async fn schedule_retry(
        &self,
        transfer_id: Uuid,
        delay_secs: u64,
        error: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE transfer_tasks SET status = 'pending', \
             available_at = now() + make_interval(secs => $2), last_error = $3 \
             WHERE id = $1",
        )
        .bind(transfer_id)
        .bind(delay_secs as f64)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Terminal dead-letter state after retries are exhausted. The row stays
    /// queryable for operators.
    pub async fn mark_failed(&self, transfer_id: Uuid, error: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE transfer_tasks SET status = 'failed', last_error = $2, finished_at = now() \
             WHERE id = $1",
        )
        .bind(transfer_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl TransferProducer for TransferRepository {
    async fn publish(&self, message: &TransferMessage) -> Result<(), AppError> {
        self.enqueue(message).await.map(|_| ())
    }
}
