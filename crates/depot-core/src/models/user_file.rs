use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Join entity between a user and a content record. At most one link exists
/// per `(user_id, file_id)` pair; the link never owns the file's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserFileLink {
    pub user_id: Uuid,
    pub file_id: Uuid,
    /// Name this user sees; may differ from the record's display name.
    pub logical_name: String,
    pub status: String,
    pub linked_at: DateTime<Utc>,
}

/// Result of a link attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A new link was created and the reference count incremented.
    Linked,
    /// The user already owns this content. Not an error: the caller reports
    /// a "repeat" outcome and leaves the reference count untouched.
    Repeat,
}

/// Result of an unlink, read inside the same transaction that decremented the
/// reference count. Physical cleanup happens outside the transaction.
#[derive(Debug, Clone)]
pub struct UnlinkOutcome {
    /// Post-decrement reference count (never negative).
    pub remaining_links: i32,
    pub storage_path: String,
    pub remote_object_key: Option<String>,
}

impl UnlinkOutcome {
    /// True when this unlink removed the last owner and the physical bytes
    /// are now eligible for deletion.
    pub fn removed_last(&self) -> bool {
        self.remaining_links == 0
    }
}
