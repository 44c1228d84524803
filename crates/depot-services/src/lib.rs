//! Depot Services Library
//!
//! Business services on top of the core traits: the upload service (single
//! shot and chunked, dedup orchestration, merge engine), the bounded
//! background deletion pool, and the stale-session cleanup sweep.

pub mod cleanup;
pub mod upload;

pub use cleanup::{CleanupService, DeletionPool};
pub use upload::merge::assemble_chunks;
pub use upload::service::UploadService;
pub use upload::types::{ChunkReceipt, FastUploadOutcome, UploadOutcome};
