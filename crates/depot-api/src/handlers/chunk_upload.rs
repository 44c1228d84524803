//! Chunk upload handler.
//!
//! Each chunk arrives as its own multipart request carrying the upload id,
//! its index, the declared total, and a per-chunk hash that is verified
//! before the chunk is accepted into the session.

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload::read_text;
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

/// Response for an accepted chunk
#[derive(Debug, Serialize, ToSchema)]
pub struct ChunkUploadResponse {
    pub upload_id: String,
    pub chunk_index: i32,
    /// Number of distinct chunks received so far
    pub received_chunks: i32,
    pub total_chunks: i32,
}

/// Upload one chunk of a chunked upload
#[utoipa::path(
    post,
    path = "/api/v0/uploads/chunks",
    tag = "uploads",
    responses(
        (status = 200, description = "Chunk accepted", body = ChunkUploadResponse),
        (status = 400, description = "Invalid input or chunk hash mismatch", body = ErrorResponse),
        (status = 503, description = "Session store unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut upload_id: Option<String> = None;
    let mut chunk_index: Option<i32> = None;
    let mut total_chunks: Option<i32> = None;
    let mut chunk_hash: Option<String> = None;
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
            "upload_id" => upload_id = Some(read_text(field).await?),
            "chunk_index" => {
                chunk_index = Some(parse_int(&read_text(field).await?, "chunk_index")?)
            }
            "total_chunks" => {
                total_chunks = Some(parse_int(&read_text(field).await?, "total_chunks")?)
            }
            "chunk_hash" => chunk_hash = Some(read_text(field).await?),
            "file_name" => file_name = Some(read_text(field).await?),
            "file" => {
                data = Some(field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read file field: {}", e))
                })?);
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let upload_id = require(upload_id, "upload_id")?;
    let chunk_index = require(chunk_index, "chunk_index")?;
    let total_chunks = require(total_chunks, "total_chunks")?;
    let chunk_hash = require(chunk_hash, "chunk_hash")?;
    let file_name = require(file_name, "file_name")?;
    let data = require(data, "file")?;

    if data.len() > state.config.max_upload_size_bytes {
        return Err(HttpAppError::from(AppError::PayloadTooLarge(format!(
            "Chunk size {} exceeds maximum {} bytes",
            data.len(),
            state.config.max_upload_size_bytes
        ))));
    }

    let receipt = state
        .uploads
        .receive_chunk(
            &upload_id,
            chunk_index,
            total_chunks,
            &chunk_hash,
            &file_name,
            data,
        )
        .await?;

    Ok(Json(ChunkUploadResponse {
        upload_id: receipt.upload_id,
        chunk_index: receipt.chunk_index,
        received_chunks: receipt.received_chunks,
        total_chunks: receipt.total_chunks,
    }))
}

fn require<T>(value: Option<T>, name: &str) -> Result<T, HttpAppError> {
    value.ok_or_else(|| {
        HttpAppError::from(AppError::InvalidInput(format!("Missing field: {}", name)))
    })
}

fn parse_int(value: &str, name: &str) -> Result<i32, HttpAppError> {
    value.trim().parse().map_err(|_| {
        HttpAppError::from(AppError::InvalidInput(format!(
            "Field {} must be an integer, got '{}'",
            name, value
        )))
    })
}
