//! File delete: unlink for this user, physical deletion only when the last
//! link is gone.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Response for a delete request
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteFileResponse {
    pub status: String,
    /// Links still pointing at the content after this delete
    pub remaining_links: i32,
}

/// Remove a file from a user's view
#[utoipa::path(
    delete,
    path = "/api/v0/users/{user_id}/files/{file_id}",
    tag = "files",
    params(
        ("user_id" = Uuid, Path, description = "User id"),
        ("file_id" = Uuid, Path, description = "File id")
    ),
    responses(
        (status = 200, description = "Link removed", body = DeleteFileResponse),
        (status = 404, description = "Link not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path((user_id, file_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let outcome = state.uploads.remove_file(user_id, file_id).await?;

    tracing::info!(
        user_id = %user_id,
        file_id = %file_id,
        remaining_links = outcome.remaining_links,
        "File deleted for user"
    );

    Ok(Json(DeleteFileResponse {
        status: "deleted".to_string(),
        remaining_links: outcome.remaining_links,
    }))
}
