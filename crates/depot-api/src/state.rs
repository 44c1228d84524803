//! Application state.
//!
//! All clients (pool, repositories, session store, remote store, services,
//! background workers) are constructed once in setup and injected here; no
//! globals. Handlers receive the state as `State<Arc<AppState>>`.

use depot_core::Config;
use depot_db::{FileRepository, TransferRepository, UserRepository};
use depot_services::UploadService;
use depot_session::SessionStore;
use depot_storage::RemoteStore;
use depot_worker::TransferWorker;
use sqlx::PgPool;
use std::sync::Arc;

#[allow(dead_code)] // Not all clients are referenced by every handler; kept for lifecycle
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub files: FileRepository,
    pub users: UserRepository,
    pub transfers: TransferRepository,
    pub sessions: Arc<dyn SessionStore>,
    pub remote: Arc<dyn RemoteStore>,
    pub uploads: Arc<UploadService>,
    /// Held here so the consumer loop lives as long as the server; dropping
    /// the worker would close its shutdown channel and stop the loop.
    pub transfer_worker: TransferWorker,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
