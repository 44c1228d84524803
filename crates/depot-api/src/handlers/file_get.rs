//! File metadata lookup.

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::status_label;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use depot_core::models::StoredFile;
use depot_core::AppError;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// File metadata response
#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    pub file_id: Uuid,
    pub content_hash: String,
    pub display_name: String,
    pub size_bytes: i64,
    pub status: String,
    pub reference_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_object_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredFile> for FileResponse {
    fn from(record: StoredFile) -> Self {
        FileResponse {
            file_id: record.id,
            content_hash: record.content_hash,
            display_name: record.display_name,
            size_bytes: record.size_bytes,
            status: status_label(record.status).to_string(),
            reference_count: record.reference_count,
            remote_object_key: record.remote_object_key,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Get file metadata by id
#[utoipa::path(
    get,
    path = "/api/v0/files/{file_id}",
    tag = "files",
    params(("file_id" = Uuid, Path, description = "File id")),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .files
        .get(file_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File not found: {}", file_id)))?;

    Ok(Json(FileResponse::from(record)))
}
