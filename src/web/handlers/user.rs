//! Account handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::db::UserRepository;
use crate::web::dto::{
    ApiResponse, ChangePasswordRequest, ChangeUsernameRequest, SearchQuery, UserInfo,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{clear_session_cookie, CurrentUser};

/// GET /api/users/search?q= - Username prefix search, for inviting.
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ApiError> {
    let prefix = query.q.trim();
    if prefix.is_empty() {
        return Ok(Json(ApiResponse::new(Vec::new())));
    }

    let users = UserRepository::new(state.db.pool())
        .search(prefix, current.id())
        .await?;
    Ok(Json(ApiResponse::new(
        users.into_iter().map(UserInfo::from).collect(),
    )))
}

/// PUT /api/users/me/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions()
        .change_password(current.id(), &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/me/username
pub async fn change_username(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<ChangeUsernameRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = state
        .sessions()
        .change_username(current.id(), &req.username)
        .await?;
    Ok(Json(ApiResponse::new(UserInfo::from(user))))
}

/// DELETE /api/users/me - Delete the account and everything it owns.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    state
        .sessions()
        .delete_account(current.id(), &state.storage)
        .await?;
    Ok((jar.remove(clear_session_cookie()), StatusCode::NO_CONTENT))
}
