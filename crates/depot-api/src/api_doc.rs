//! OpenAPI documentation.

use crate::error::ErrorResponse;
use crate::handlers::{
    chunk_upload, fast_upload, file_delete, file_download, file_get, file_update, health, merge,
    upload, user_files, users,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        users::register_user,
        upload::upload_file,
        chunk_upload::upload_chunk,
        merge::merge_upload,
        fast_upload::fast_upload,
        file_get::get_file,
        file_download::download_file,
        file_download::presigned_url,
        file_update::update_file,
        file_delete::delete_file,
        user_files::list_user_files,
    ),
    components(schemas(
        ErrorResponse,
        users::RegisterUserRequest,
        users::RegisterUserResponse,
        upload::UploadResponse,
        chunk_upload::ChunkUploadResponse,
        merge::MergeRequest,
        fast_upload::FastUploadRequest,
        fast_upload::FastUploadResponse,
        file_get::FileResponse,
        file_download::PresignedUrlResponse,
        file_update::UpdateFileRequest,
        file_delete::DeleteFileResponse,
        user_files::UserFileResponse,
    )),
    tags(
        (name = "files", description = "Upload, dedup, and file lifecycle"),
        (name = "uploads", description = "Chunked upload sessions"),
        (name = "users", description = "Account registration"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "depot",
        description = "Content-addressed, deduplicating file store with resumable chunked upload and asynchronous remote tiering"
    )
)]
pub struct ApiDoc;
