//! Organisation and membership handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::file::AuditReport;
use crate::org::{OrgInvite, OrgMember};
use crate::web::dto::{
    ApiResponse, ChangeRoleRequest, CountResponse, InviteRequest, OrgListResponse, OrgNameRequest,
    OrgResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;
use crate::FmsError;

async fn org_response(state: &AppState, user_id: &str, org_id: i64) -> Result<OrgResponse, ApiError> {
    let orgs = state.orgs();
    let org = orgs.get_org(org_id).await?;
    let access = orgs
        .access(user_id, org_id)
        .await?
        .ok_or_else(|| FmsError::Forbidden("not a member of this organisation".into()))?;

    Ok(OrgResponse {
        org,
        role: access.role,
        capabilities: access.capabilities,
    })
}

/// POST /api/orgs - Create the caller's organisation.
pub async fn create_org(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<OrgNameRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrgResponse>>), ApiError> {
    let org = state.orgs().create_org(current.id(), &req.name).await?;
    let response = org_response(&state, current.id(), org.id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// GET /api/orgs - The organisation the caller owns and those they joined.
pub async fn list_orgs(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<OrgListResponse>>, ApiError> {
    let orgs = state.orgs();
    let owned = orgs.owned_org(current.id()).await?;
    let joined = orgs.joined_orgs(current.id()).await?;
    Ok(Json(ApiResponse::new(OrgListResponse { owned, joined })))
}

/// GET /api/orgs/:org_id
pub async fn get_org(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
) -> Result<Json<ApiResponse<OrgResponse>>, ApiError> {
    let response = org_response(&state, current.id(), org_id).await?;
    Ok(Json(ApiResponse::new(response)))
}

/// PATCH /api/orgs/:org_id - Rename.
pub async fn rename_org(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<OrgNameRequest>,
) -> Result<Json<ApiResponse<OrgResponse>>, ApiError> {
    state
        .orgs()
        .change_org_name(current.id(), org_id, &req.name)
        .await?;
    let response = org_response(&state, current.id(), org_id).await?;
    Ok(Json(ApiResponse::new(response)))
}

/// DELETE /api/orgs/:org_id
pub async fn delete_org(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.orgs().delete_org(current.id(), org_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/orgs/:org_id/members
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<OrgMember>>>, ApiError> {
    let members = state.orgs().members(current.id(), org_id).await?;
    Ok(Json(ApiResponse::new(members)))
}

/// PUT /api/orgs/:org_id/members/:username - Change a member's role.
pub async fn change_member_role(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path((org_id, username)): Path<(i64, String)>,
    Json(req): Json<ChangeRoleRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .orgs()
        .change_member_role(current.id(), org_id, &username, req.role)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/orgs/:org_id/members/:username
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path((org_id, username)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .orgs()
        .remove_member(current.id(), org_id, &username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/orgs/:org_id/invites - Invite a user by username.
pub async fn invite_user(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<InviteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrgInvite>>), ApiError> {
    let invite = state
        .orgs()
        .invite_user(current.id(), org_id, &req.username)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(invite))))
}

/// GET /api/orgs/:org_id/audit - Compare rows with the disk tree.
pub async fn audit_org(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
) -> Result<Json<ApiResponse<AuditReport>>, ApiError> {
    let report = state.hierarchy().audit(current.id(), org_id).await?;
    Ok(Json(ApiResponse::new(report)))
}

/// POST /api/orgs/:org_id/audit/prune - Remove untracked disk entries.
pub async fn prune_org(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(org_id): Path<i64>,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let removed = state
        .hierarchy()
        .prune_untracked(current.id(), org_id)
        .await?;
    Ok(Json(ApiResponse::new(CountResponse {
        count: removed as u64,
    })))
}
