//! File download (local canonical copy) and presigned remote URL.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use depot_core::models::FileStatus;
use depot_core::AppError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;
use uuid::Uuid;

/// Presigned URL response
#[derive(Debug, Serialize, ToSchema)]
pub struct PresignedUrlResponse {
    pub url: String,
    pub expires_in_secs: u64,
}

/// Download a file's bytes
#[utoipa::path(
    get,
    path = "/api/v0/files/{file_id}/download",
    tag = "files",
    params(("file_id" = Uuid, Path, description = "File id")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .files
        .get(file_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File not found: {}", file_id)))?;

    if record.status == FileStatus::Deleted {
        return Err(HttpAppError::from(AppError::NotFound(format!(
            "File not found: {}",
            file_id
        ))));
    }

    let file = tokio::fs::File::open(&record.storage_path)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                file_id = %file_id,
                path = %record.storage_path,
                "Canonical local copy unreadable"
            );
            AppError::Storage(format!("Failed to open stored file: {}", e))
        })?;

    let headers = [
        (
            header::CONTENT_TYPE,
            "application/octet-stream".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", record.display_name),
        ),
        (header::CONTENT_LENGTH, record.size_bytes.to_string()),
    ];

    let body = Body::from_stream(ReaderStream::new(file));

    Ok((headers, body))
}

/// Get a presigned remote URL for an archived file
#[utoipa::path(
    get,
    path = "/api/v0/files/{file_id}/url",
    tag = "files",
    params(("file_id" = Uuid, Path, description = "File id")),
    responses(
        (status = 200, description = "Presigned URL", body = PresignedUrlResponse),
        (status = 400, description = "File not archived yet", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn presigned_url(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .files
        .get(file_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File not found: {}", file_id)))?;

    let key = match (record.status, record.remote_object_key.as_deref()) {
        (FileStatus::Archived, Some(key)) => key.to_string(),
        (FileStatus::Deleted, _) => {
            return Err(HttpAppError::from(AppError::NotFound(format!(
                "File not found: {}",
                file_id
            ))))
        }
        _ => {
            return Err(HttpAppError::from(AppError::BadRequest(
                "File is not archived yet".to_string(),
            )))
        }
    };

    let expires_in_secs = state.config.presigned_url_ttl_secs;
    let url = state
        .remote
        .presigned_get_url(&key, Duration::from_secs(expires_in_secs))
        .await?;

    Ok(Json(PresignedUrlResponse {
        url,
        expires_in_secs,
    }))
}
