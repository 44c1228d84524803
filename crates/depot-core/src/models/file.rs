use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a content record.
///
/// `deleted` is a soft state: the row keeps the content hash reserved until
/// physical cleanup finishes, so a concurrent re-upload of the same bytes
/// revives the record instead of violating the hash uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Active,
    Archived,
    Deleted,
}

impl FileStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "pending" => Some(FileStatus::Pending),
            "active" => Some(FileStatus::Active),
            "archived" => Some(FileStatus::Archived),
            "deleted" => Some(FileStatus::Deleted),
            _ => None,
        }
    }
}

/// One row per distinct content hash. Logical ownership lives in
/// [`super::UserFileLink`]; this record owns the physical bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StoredFile {
    pub id: Uuid,
    pub content_hash: String,
    /// Display name of the first uploader; mutable via metadata update.
    pub display_name: String,
    pub size_bytes: i64,
    /// Canonical local path of the physical bytes.
    pub storage_path: String,
    pub status: FileStatus,
    /// Number of distinct user links pointing at this record.
    pub reference_count: i32,
    /// Set once the transfer consumer has archived the object remotely.
    pub remote_object_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredFile {
    /// Physical bytes are eligible for deletion once nothing links to them.
    pub fn is_orphaned(&self) -> bool {
        self.reference_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_status_parse_roundtrip() {
        for (s, v) in [
            ("pending", FileStatus::Pending),
            ("active", FileStatus::Active),
            ("archived", FileStatus::Archived),
            ("deleted", FileStatus::Deleted),
        ] {
            assert_eq!(FileStatus::parse(s), Some(v));
        }
        assert_eq!(FileStatus::parse("bogus"), None);
    }
}
