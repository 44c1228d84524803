//! Transfer consumer: worker pool, LISTEN/NOTIFY or polling, retry, and
//! dead-lettering.
//!
//! Delivery is at-least-once; the remote put overwrites by key, so a replayed
//! task converges on the same remote object. The default configuration runs a
//! single consumer, which bounds remote-store write concurrency; more
//! consumers are safe because claims use SKIP LOCKED and puts are idempotent.

use depot_core::models::TransferTask;
use depot_db::{FileRepository, TransferRepository, TRANSFER_NOTIFY_CHANNEL};
use depot_storage::RemoteStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;

/// Maximum delay in seconds before retrying a failed transfer. Caps the
/// exponential backoff so high attempt counts do not produce excessive delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Backoff in seconds for a given attempt count (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff_seconds(attempts: i32) -> u64 {
    (2_u64.pow(attempts.max(0) as u32)).min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Clone)]
pub struct TransferWorkerConfig {
    /// Number of concurrent consumers. One by default.
    pub consumers: usize,
    pub poll_interval_ms: u64,
    /// Retries after the first failed attempt before dead-lettering.
    pub max_retries: i32,
}

impl Default for TransferWorkerConfig {
    fn default() -> Self {
        Self {
            consumers: 1,
            poll_interval_ms: 1000,
            max_retries: 3,
        }
    }
}

pub struct TransferWorker {
    shutdown_tx: mpsc::Sender<()>,
}

impl TransferWorker {
    /// Start the consumer loop.
    ///
    /// If `pool` is `Some`, the worker uses PostgreSQL LISTEN/NOTIFY to wake
    /// immediately when a transfer is enqueued, in addition to polling at
    /// `poll_interval_ms`. If `pool` is `None`, only polling is used.
    pub fn start(
        repository: TransferRepository,
        files: FileRepository,
        remote: Arc<dyn RemoteStore>,
        pool: Option<sqlx::PgPool>,
        config: TransferWorkerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::worker_loop(repository, files, remote, config, shutdown_rx, pool).await;
        });

        Self { shutdown_tx }
    }

    async fn worker_loop(
        repository: TransferRepository,
        files: FileRepository,
        remote: Arc<dyn RemoteStore>,
        config: TransferWorkerConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
        pool: Option<sqlx::PgPool>,
    ) {
        let use_listen = pool.is_some();
        tracing::info!(
            consumers = config.consumers,
            poll_interval_ms = config.poll_interval_ms,
            max_retries = config.max_retries,
            listen_notify = use_listen,
            "Transfer worker started"
        );

        let semaphore = Arc::new(Semaphore::new(config.consumers.max(1)));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        // Wake the main loop when LISTEN receives a NOTIFY.
        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(16);
        if let Some(pool) = pool {
            let tx = notify_tx.clone();
            tokio::spawn(async move {
                loop {
                    match sqlx::postgres::PgListener::connect_with(&pool).await {
                        Ok(mut listener) => {
                            if let Err(e) = listener.listen(TRANSFER_NOTIFY_CHANNEL).await {
                                tracing::warn!(error = %e, "LISTEN failed, will retry");
                                tokio::time::sleep(Duration::from_secs(5)).await;
                                continue;
                            }
                            while listener.recv().await.is_ok() {
                                let _ = tx.send(()).await;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "PgListener connect failed, will retry");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            });
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Transfer worker shutting down");
                    break;
                }
                _ = notify_rx.recv() => {
                    Self::claim_and_dispatch(
                        &repository,
                        &files,
                        &remote,
                        &semaphore,
                        config.max_retries,
                    ).await;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch(
                        &repository,
                        &files,
                        &remote,
                        &semaphore,
                        config.max_retries,
                    ).await;
                }
            }
        }

        tracing::info!("Transfer worker stopped");
    }

    async fn claim_and_dispatch(
        repository: &TransferRepository,
        files: &FileRepository,
        remote: &Arc<dyn RemoteStore>,
        semaphore: &Arc<Semaphore>,
        max_retries: i32,
    ) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("No consumers available, skipping claim");
                return;
            }
        };

        match repository.claim_next().await {
            Ok(Some(task)) => {
                let repo = repository.clone();
                let files = files.clone();
                let remote = remote.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    Self::process_task(task, repo, files, remote, max_retries).await;
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No transfers due");
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to claim transfer from queue");
            }
        }
    }

    async fn process_task(
        task: TransferTask,
        repository: TransferRepository,
        files: FileRepository,
        remote: Arc<dyn RemoteStore>,
        max_retries: i32,
    ) {
        tracing::info!(
            transfer_id = %task.id,
            file_id = %task.file_id,
            key = %task.remote_object_key,
            attempt = task.attempts,
            "Archiving file to remote store"
        );

        match remote
            .put(&task.remote_object_key, Path::new(&task.local_path))
            .await
        {
            Ok(()) => {
                if let Err(e) = files
                    .mark_archived(task.file_id, &task.remote_object_key)
                    .await
                {
                    // The object is durable remotely; only the status flag
                    // lagged. The next successful replay repairs it.
                    tracing::error!(error = %e, file_id = %task.file_id, "Failed to mark file archived");
                }
                if let Err(e) = repository.mark_completed(task.id).await {
                    tracing::error!(error = %e, transfer_id = %task.id, "Failed to mark transfer completed");
                }
                tracing::info!(
                    transfer_id = %task.id,
                    file_id = %task.file_id,
                    "File archived"
                );
            }
            Err(e) => {
                if task.attempts <= max_retries {
                    let backoff = compute_retry_backoff_seconds(task.attempts);
                    tracing::warn!(
                        error = %e,
                        transfer_id = %task.id,
                        attempt = task.attempts,
                        backoff_seconds = backoff,
                        "Transfer failed, scheduling retry"
                    );
                    if let Err(retry_err) = repository
                        .schedule_retry(task.id, backoff, &e.to_string())
                        .await
                    {
                        tracing::error!(error = %retry_err, transfer_id = %task.id, "Failed to schedule retry");
                    }
                } else {
                    tracing::error!(
                        error = %e,
                        transfer_id = %task.id,
                        attempts = task.attempts,
                        "Transfer failed after maximum retries, dead-lettering"
                    );
                    if let Err(fail_err) = repository.mark_failed(task.id, &e.to_string()).await {
                        tracing::error!(error = %fail_err, transfer_id = %task.id, "Failed to dead-letter transfer");
                    }
                }
            }
        }
    }

    /// Signal the worker loop to stop claiming new transfers. In-flight puts
    /// finish on their own.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating transfer worker shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff_seconds(0), 1);
        assert_eq!(compute_retry_backoff_seconds(1), 2);
        assert_eq!(compute_retry_backoff_seconds(2), 4);
        assert_eq!(compute_retry_backoff_seconds(8), 256);
        assert_eq!(compute_retry_backoff_seconds(9), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(12), MAX_RETRY_BACKOFF_SECS);
    }
}
