//! Listing of a user's linked files.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// One user-file link
#[derive(Debug, Serialize, ToSchema)]
pub struct UserFileResponse {
    pub file_id: Uuid,
    pub logical_name: String,
    pub status: String,
    pub linked_at: DateTime<Utc>,
}

/// List the files linked to a user
#[utoipa::path(
    get,
    path = "/api/v0/users/{user_id}/files",
    tag = "files",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User's file links", body = [UserFileResponse]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_user_files(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let links = state.files.links_for_user(user_id).await?;

    let response: Vec<UserFileResponse> = links
        .into_iter()
        .map(|link| UserFileResponse {
            file_id: link.file_id,
            logical_name: link.logical_name,
            status: link.status,
            linked_at: link.linked_at,
        })
        .collect();

    Ok(Json(response))
}
