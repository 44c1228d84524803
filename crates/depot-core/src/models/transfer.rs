use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire record published once per finalized file and consumed at least once.
/// The consumer's put is an idempotent overwrite-by-key, so redelivery is safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMessage {
    pub file_id: Uuid,
    pub local_path: String,
    pub remote_object_key: String,
}

/// Queue states of a transfer task. `failed` is the dead-letter terminal
/// state reached after retries are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "transfer_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A claimed row from the durable transfer queue.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransferTask {
    pub id: Uuid,
    pub file_id: Uuid,
    pub local_path: String,
    pub remote_object_key: String,
    pub status: TransferStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub available_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TransferTask {
    pub fn message(&self) -> TransferMessage {
        TransferMessage {
            file_id: self.file_id,
            local_path: self.local_path.clone(),
            remote_object_key: self.remote_object_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_message_wire_format() {
        let msg = TransferMessage {
            file_id: Uuid::nil(),
            local_path: "/var/lib/depot/files/a_report.pdf".to_string(),
            remote_object_key: "file-store/report.pdf".to_string(),
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "file_id": "00000000-0000-0000-0000-000000000000",
                "local_path": "/var/lib/depot/files/a_report.pdf",
                "remote_object_key": "file-store/report.pdf",
            })
        );

        let back: TransferMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
