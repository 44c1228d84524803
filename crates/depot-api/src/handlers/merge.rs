//! Merge/finalize handler for chunked uploads.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::outcome_label;
use crate::handlers::upload::UploadResponse;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request to merge a complete chunked upload
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MergeRequest {
    #[validate(length(min = 1, max = 128))]
    pub upload_id: String,
    pub user_id: Uuid,
    /// Client-declared hash of the final assembled file
    #[validate(length(equal = 64))]
    pub file_hash: String,
}

/// Merge all chunks of an upload session into one file
#[utoipa::path(
    post,
    path = "/api/v0/uploads/merge",
    tag = "uploads",
    request_body = MergeRequest,
    responses(
        (status = 200, description = "Upload merged and accepted", body = UploadResponse),
        (status = 400, description = "Missing chunk or hash mismatch", body = ErrorResponse),
        (status = 404, description = "Upload session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn merge_upload(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<MergeRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(depot_core::AppError::from)?;

    let outcome = state
        .uploads
        .merge_chunks(&request.upload_id, request.user_id, &request.file_hash)
        .await?;

    tracing::info!(
        upload_id = %request.upload_id,
        user_id = %request.user_id,
        file_id = %outcome.file_id,
        status = outcome_label(outcome.outcome),
        "Chunked upload finalized"
    );

    Ok(Json(UploadResponse {
        file_id: outcome.file_id,
        status: outcome_label(outcome.outcome).to_string(),
        deduplicated: outcome.deduplicated,
    }))
}
