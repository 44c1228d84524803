//! Plain user registration. Authentication and session tokens are an
//! external collaborator's concern.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use depot_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUserRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Registration response
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterUserResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/api/v0/users",
    tag = "users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User created", body = RegisterUserResponse),
        (status = 400, description = "Invalid input or duplicate account", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RegisterUserRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(request.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
        .to_string();

    let user = state
        .users
        .create(&request.username, &request.email, &password_hash)
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterUserResponse {
            user_id: user.id,
            username: user.username,
            email: user.email,
        }),
    ))
}
