//! Capability traits for the dedup engine and transfer producer.
//!
//! The services layer works against these traits so tests can substitute
//! in-memory fakes and so client lifecycle stays explicit. Production
//! implementations live in `depot-db` on top of Postgres.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{LinkOutcome, StoredFile, TransferMessage, UnlinkOutcome};

/// Content-addressed file index: lookup, registration, and reference-counted
/// user links. Implementations must enforce hash uniqueness and serialize
/// reference-count mutations with the link mutation in one transaction.
#[async_trait]
pub trait FileIndex: Send + Sync {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<StoredFile>, AppError>;

    /// Register content under its hash, or return the existing record.
    ///
    /// Returns `(record, true)` when a new record was created (the caller's
    /// local bytes become the canonical copy) and `(record, false)` when the
    /// hash was already known (the caller's local bytes are redundant).
    /// Implementations must survive the two-uploader race on the same hash:
    /// the loser detects the uniqueness conflict and falls back to the
    /// existing record.
    async fn register_content(
        &self,
        content_hash: &str,
        display_name: &str,
        size_bytes: i64,
        storage_path: &str,
    ) -> Result<(StoredFile, bool), AppError>;

    async fn link_exists(&self, user_id: Uuid, file_id: Uuid) -> Result<bool, AppError>;

    /// Insert the user link and increment the reference count atomically.
    /// A pre-existing link yields [`LinkOutcome::Repeat`] with no count change.
    async fn link(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        logical_name: &str,
    ) -> Result<LinkOutcome, AppError>;

    /// Delete the user link and decrement the reference count atomically,
    /// flooring at zero. When the count reaches zero the record is marked
    /// deleted inside the same transaction; physical cleanup is the caller's
    /// follow-up outside it.
    async fn unlink(&self, user_id: Uuid, file_id: Uuid) -> Result<UnlinkOutcome, AppError>;

    async fn get(&self, file_id: Uuid) -> Result<Option<StoredFile>, AppError>;
}

/// Producer side of the transfer pipeline: enqueue one message per finalized
/// file for the archive consumer.
#[async_trait]
pub trait TransferProducer: Send + Sync {
    async fn publish(&self, message: &TransferMessage) -> Result<(), AppError>;
}
