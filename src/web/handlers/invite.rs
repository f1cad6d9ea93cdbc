//! Handlers for invites addressed to the caller.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::org::{OrgInvite, OrgMember};
use crate::web::dto::ApiResponse;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// GET /api/invites
pub async fn list_invites(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<Vec<OrgInvite>>>, ApiError> {
    let invites = state.orgs().user_invites(current.id()).await?;
    Ok(Json(ApiResponse::new(invites)))
}

/// POST /api/invites/:org_id/accept - Join as a viewer.
pub async fn accept_invite(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
) -> Result<Json<ApiResponse<OrgMember>>, ApiError> {
    let member = state.orgs().accept_invite(current.id(), org_id).await?;
    Ok(Json(ApiResponse::new(member)))
}

/// POST /api/invites/:org_id/decline
pub async fn decline_invite(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.orgs().decline_invite(current.id(), org_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
