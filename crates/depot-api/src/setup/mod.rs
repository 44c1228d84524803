//! Application initialization: database, directories, services, background
//! workers, and routes. Everything is constructed here and injected; nothing
//! initializes itself at first use.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use depot_core::Config;
use depot_db::{FileRepository, PgSessionStore, TransferRepository, UserRepository};
use depot_services::{CleanupService, DeletionPool, UploadService};
use depot_session::SessionStore;
use depot_worker::{TransferWorker, TransferWorkerConfig};
use std::sync::Arc;
use std::time::Duration;

pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    let pool = database::setup_database(&config).await?;
    storage::ensure_local_dirs(&config).await?;
    let remote = depot_storage::create_remote_store(&config)
        .await
        .context("Failed to initialize remote store")?;

    let files = FileRepository::new(pool.clone());
    let users = UserRepository::new(pool.clone());
    let transfers = TransferRepository::new(pool.clone());
    let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool.clone()));

    let deletions = DeletionPool::new(config.deletion_pool_size);

    let uploads = Arc::new(UploadService::new(
        Arc::new(files.clone()),
        sessions.clone(),
        Arc::new(transfers.clone()),
        remote.clone(),
        deletions,
        config.file_store_dir.clone(),
        config.chunk_staging_dir.clone(),
        config.remote_key_prefix.clone(),
    ));

    let transfer_worker = TransferWorker::start(
        transfers.clone(),
        files.clone(),
        remote.clone(),
        Some(pool.clone()),
        TransferWorkerConfig {
            consumers: config.transfer_consumers,
            poll_interval_ms: config.transfer_poll_interval_ms,
            max_retries: config.transfer_max_retries,
        },
    );

    let cleanup = Arc::new(CleanupService::new(
        sessions.clone(),
        config.chunk_staging_dir.clone(),
        Duration::from_secs(config.upload_session_ttl_secs),
        Duration::from_secs(config.cleanup_interval_secs),
    ));
    cleanup.start();

    let state = Arc::new(AppState {
        config: config.clone(),
        pool,
        files,
        users,
        transfers,
        sessions,
        remote,
        uploads,
        transfer_worker,
    });

    let router = routes::setup_routes(&config, state.clone());

    Ok((state, router))
}
