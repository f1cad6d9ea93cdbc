//! Folder handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::file::{Folder, FolderListing};
use crate::web::dto::{ApiResponse, CreateFolderRequest, ParentQuery, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// GET /api/orgs/:org_id/folders?parent_id=|parent= - Contents of the root
/// or of one folder.
pub async fn list_folder(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
    Query(query): Query<ParentQuery>,
) -> Result<Json<ApiResponse<FolderListing>>, ApiError> {
    let listing = state
        .hierarchy()
        .list(current.id(), org_id, &query.parent_ref())
        .await?;
    Ok(Json(ApiResponse::new(listing)))
}

/// POST /api/orgs/:org_id/folders
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Folder>>), ApiError> {
    let folder = state
        .hierarchy()
        .create_folder(current.id(), org_id, &req.name, &req.parent_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(folder))))
}

/// DELETE /api/orgs/:org_id/folders/:folder_id - Remove a folder and
/// everything below it.
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path((org_id, folder_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state
        .hierarchy()
        .delete_folder(current.id(), org_id, folder_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
