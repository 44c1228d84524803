//! Depot Core Library
//!
//! Shared types for the depot file store: the error taxonomy, configuration,
//! the content hasher, domain models, and the capability traits that the
//! services layer uses for dependency injection.

pub mod config;
pub mod error;
pub mod hash;
pub mod models;
pub mod traits;

pub use config::{Config, RemoteBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use traits::{FileIndex, TransferProducer};
