//! Route configuration and setup.

use crate::api_doc::ApiDoc;
use crate::handlers::{
    chunk_upload, fast_upload, file_delete, file_download, file_get, file_update, health, merge,
    upload, user_files, users,
};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post},
    Json, Router,
};
use depot_core::Config;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

// Multipart framing overhead on top of the configured upload size.
const BODY_LIMIT_SLACK_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    let cors = setup_cors(config);

    Router::new()
        .route("/healthz", get(health::healthz))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route("/api/v0/users", post(users::register_user))
        .route("/api/v0/files", post(upload::upload_file))
        .route("/api/v0/files/fast-upload", post(fast_upload::fast_upload))
        .route("/api/v0/uploads/chunks", post(chunk_upload::upload_chunk))
        .route("/api/v0/uploads/merge", post(merge::merge_upload))
        .route(
            "/api/v0/files/{file_id}",
            get(file_get::get_file).put(file_update::update_file),
        )
        .route(
            "/api/v0/files/{file_id}/download",
            get(file_download::download_file),
        )
        .route(
            "/api/v0/files/{file_id}/url",
            get(file_download::presigned_url),
        )
        .route(
            "/api/v0/users/{user_id}/files",
            get(user_files::list_user_files),
        )
        .route(
            "/api/v0/users/{user_id}/files/{file_id}",
            delete(file_delete::delete_file),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(
            config.max_upload_size_bytes + BODY_LIMIT_SLACK_BYTES,
        ))
        .layer(cors)
        .with_state(state)
}

fn setup_cors(config: &Config) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
