//! Registration, login and session handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::SESSION_COOKIE_NAME;
use crate::web::dto::{ApiResponse, CredentialsRequest, MeResponse, UserInfo, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{clear_session_cookie, session_cookie, CurrentUser};

/// POST /api/auth/register - Create an account and sign in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<CredentialsRequest>,
) -> Result<(StatusCode, CookieJar, Json<ApiResponse<UserInfo>>), ApiError> {
    let (user, session) = state.sessions().register(&req.username, &req.password).await?;

    let jar = jar.add(session_cookie(session.id, state.secure_cookies));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(ApiResponse::new(UserInfo::from(user))),
    ))
}

/// POST /api/auth/login - Sign in.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<CredentialsRequest>,
) -> Result<(CookieJar, Json<ApiResponse<UserInfo>>), ApiError> {
    let (user, session) = state.sessions().login(&req.username, &req.password).await?;

    let jar = jar.add(session_cookie(session.id, state.secure_cookies));
    Ok((jar, Json(ApiResponse::new(UserInfo::from(user)))))
}

/// POST /api/auth/logout - End the current session.
///
/// Always clears the cookie, even when the token was already gone.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    if let Some(token) = jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string()) {
        if !state.sessions().logout(&token).await? {
            tracing::debug!("logout with unknown session token");
        }
    }

    Ok((jar.remove(clear_session_cookie()), StatusCode::NO_CONTENT))
}

/// GET /api/auth/me - The caller with their organisations.
pub async fn me(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user_id = current.id();
    let orgs = state.orgs();
    let owned_org = orgs.owned_org(user_id).await?;
    let joined_orgs = orgs.joined_orgs(user_id).await?;
    let unread_notifications = state.notifications().unread_count(user_id).await?;

    let CurrentUser(auth) = current;
    Ok(Json(ApiResponse::new(MeResponse {
        user: UserInfo::from(auth.user),
        owned_org,
        joined_orgs,
        unread_notifications,
        session_expires_at: auth.session.expires_at,
    })))
}
