//! Cookie session authentication.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::{AuthenticatedUser, SESSION_COOKIE_NAME};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Extractor for the authenticated caller.
///
/// Reads the `session_token` cookie and validates it against the session
/// table. A missing, unknown or expired session is rejected with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.user.id
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string());

        let authenticated = state
            .sessions()
            .authenticate(token.as_deref())
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "session rejected");
                ApiError::from(e)
            })?;

        Ok(CurrentUser(authenticated))
    }
}

/// Build the session cookie for a freshly issued token.
pub fn session_cookie(token: impl Into<String>, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token.into()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie that clears the session on the client.
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, "")).path("/").build()
}
