//! Fast upload: hash-only probe that links to existing content without
//! transferring bytes.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use depot_services::FastUploadOutcome;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request for a fast upload probe
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FastUploadRequest {
    pub user_id: Uuid,
    #[validate(length(equal = 64))]
    pub file_hash: String,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
}

/// Response for a fast upload probe
#[derive(Debug, Serialize, ToSchema)]
pub struct FastUploadResponse {
    /// "not_exists", "repeat", or "linked"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<Uuid>,
}

/// Link known content by hash without uploading bytes
#[utoipa::path(
    post,
    path = "/api/v0/files/fast-upload",
    tag = "files",
    request_body = FastUploadRequest,
    responses(
        (status = 200, description = "Probe outcome", body = FastUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn fast_upload(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<FastUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(depot_core::AppError::from)?;

    let outcome = state
        .uploads
        .fast_upload(request.user_id, &request.file_hash, &request.file_name)
        .await?;

    let response = match outcome {
        FastUploadOutcome::NotExists => FastUploadResponse {
            status: "not_exists".to_string(),
            file_id: None,
        },
        FastUploadOutcome::Repeat { file_id } => FastUploadResponse {
            status: "repeat".to_string(),
            file_id: Some(file_id),
        },
        FastUploadOutcome::Linked { file_id } => FastUploadResponse {
            status: "linked".to_string(),
            file_id: Some(file_id),
        },
    };

    Ok(Json(response))
}
