//! File metadata update (rename, status).

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::file_get::FileResponse;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use depot_core::models::FileStatus;
use depot_core::AppError;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request to update file metadata; omitted fields keep their value
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateFileRequest {
    #[validate(length(min = 1, max = 255))]
    pub display_name: Option<String>,
    /// One of "pending", "active", "archived", "deleted"
    pub status: Option<String>,
}

/// Update a file's display name or status
#[utoipa::path(
    put,
    path = "/api/v0/files/{file_id}",
    tag = "files",
    params(("file_id" = Uuid, Path, description = "File id")),
    request_body = UpdateFileRequest,
    responses(
        (status = 200, description = "Updated metadata", body = FileResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn update_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateFileRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    if request.display_name.is_none() && request.status.is_none() {
        return Err(HttpAppError::from(AppError::InvalidInput(
            "Nothing to update".to_string(),
        )));
    }

    let status = match request.status.as_deref() {
        Some(value) => Some(FileStatus::parse(value).ok_or_else(|| {
            AppError::InvalidInput(format!("Unknown status: {}", value))
        })?),
        None => None,
    };

    let record = state
        .files
        .update_meta(file_id, request.display_name.as_deref(), status)
        .await?;

    tracing::info!(file_id = %file_id, "File metadata updated");

    Ok(Json(FileResponse::from(record)))
}
