//! File upload, download and delete handlers.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};

use crate::file::{validate_upload, FileRecord, Upload};
use crate::web::dto::{ApiResponse, ParentQuery};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// Content-Disposition value for a download.
///
/// Control characters, quotes and backslashes are replaced in the plain
/// `filename`; non-ASCII names also get an RFC 5987 `filename*`.
fn content_disposition_header(filename: &str) -> String {
    let needs_escape = |c: char| c.is_control() || c == '"' || c == '\\';

    if filename.is_ascii() && !filename.chars().any(needs_escape) {
        return format!("attachment; filename=\"{filename}\"");
    }

    let sanitized: String = filename
        .chars()
        .map(|c| if needs_escape(c) || !c.is_ascii() { '_' } else { c })
        .collect();
    let encoded = urlencoding::encode(filename);
    format!("attachment; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}

fn multipart_error(e: MultipartError) -> ApiError {
    tracing::debug!(error = %e, "failed to read multipart body");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Upload exceeds the maximum size")
    } else {
        ApiError::bad_request("Invalid multipart data")
    }
}

/// POST /api/orgs/:org_id/files?parent_id=|parent= - Upload the multipart
/// `file` field.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
    Query(query): Query<ParentQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileRecord>>), ApiError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("File name is required"))?;
        let content = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, content));
    }

    let (filename, content) = upload.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    validate_upload(&filename, content.len() as u64, state.max_upload_size)?;

    let record = state
        .hierarchy()
        .upload_file(
            current.id(),
            org_id,
            &query.parent_ref(),
            Upload::new(filename, content.len() as u64, &content[..]),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(record))))
}

/// GET /api/orgs/:org_id/files/:file_id/download
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path((org_id, file_id)): Path<(i64, i64)>,
) -> Result<Response<Body>, ApiError> {
    let stored = state
        .hierarchy()
        .open_file(current.id(), org_id, file_id)
        .await?;
    let content = state.storage.read(&stored.path).await?;

    let content_type = mime_guess::from_path(&stored.record.name)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&stored.record.name),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!(error = %e, "failed to build download response");
            ApiError::internal("Failed to build response")
        })
}

/// DELETE /api/orgs/:org_id/files/:file_id
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path((org_id, file_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state
        .hierarchy()
        .delete_file(current.id(), org_id, file_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
