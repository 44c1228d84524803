//! Depot Database Library
//!
//! Postgres repositories for the file index, the shared upload session store,
//! the durable transfer queue, and user accounts. Each repository wraps a
//! cloned `PgPool` and is constructed explicitly at startup.

pub mod db;

pub use db::files::FileRepository;
pub use db::sessions::PgSessionStore;
pub use db::transfers::{TransferRepository, TRANSFER_NOTIFY_CHANNEL};
pub use db::users::UserRepository;
