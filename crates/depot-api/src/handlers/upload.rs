//! Single-shot upload handler.
//!
//! Accepts the whole file in one multipart request with the client-declared
//! content hash; hashing, dedup, and linking happen inline.

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::outcome_label;
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use depot_core::AppError;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Response for an accepted upload
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub file_id: Uuid,
    /// "linked" for a new link, "repeat" when the user already owned the content
    pub status: String,
    /// True when identical content was already stored and only a link was added
    pub deduplicated: bool,
}

/// Upload a file in one request
#[utoipa::path(
    post,
    path = "/api/v0/files",
    tag = "files",
    responses(
        (status = 200, description = "File accepted", body = UploadResponse),
        (status = 400, description = "Invalid input or hash mismatch", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut user_id: Option<Uuid> = None;
    let mut file_hash: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut data: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        HttpAppError::from(AppError::BadRequest(format!(
            "Failed to parse form data: {}",
            e
        )))
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => {
                let text = read_text(field).await?;
                user_id = Some(text.parse().map_err(AppError::from)?);
            }
            "file_hash" => file_hash = Some(read_text(field).await?),
            "file" => {
                file_name = field.file_name().map(ToString::to_string);
                data = Some(field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read file field: {}", e))
                })?);
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let user_id =
        user_id.ok_or_else(|| AppError::InvalidInput("Missing field: user_id".to_string()))?;
    let file_hash =
        file_hash.ok_or_else(|| AppError::InvalidInput("Missing field: file_hash".to_string()))?;
    let data = data.ok_or_else(|| AppError::InvalidInput("Missing field: file".to_string()))?;
    let file_name =
        file_name.ok_or_else(|| AppError::InvalidInput("Missing file name".to_string()))?;

    if data.len() > state.config.max_upload_size_bytes {
        return Err(HttpAppError::from(AppError::PayloadTooLarge(format!(
            "File size {} exceeds maximum {} bytes",
            data.len(),
            state.config.max_upload_size_bytes
        ))));
    }

    let outcome = state
        .uploads
        .store_file(user_id, &file_hash, &file_name, data)
        .await?;

    tracing::info!(
        user_id = %user_id,
        file_id = %outcome.file_id,
        status = outcome_label(outcome.outcome),
        deduplicated = outcome.deduplicated,
        "Single-shot upload accepted"
    );

    Ok(Json(UploadResponse {
        file_id: outcome.file_id,
        status: outcome_label(outcome.outcome).to_string(),
        deduplicated: outcome.deduplicated,
    }))
}

pub(crate) async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, HttpAppError> {
    let name = field.name().unwrap_or_default().to_string();
    field
        .text()
        .await
        .map_err(|e| HttpAppError::from(AppError::BadRequest(format!("Invalid field {}: {}", name, e))))
}
