//! Router configuration.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    accept_invite, audit_org, change_member_role, change_password, change_username, create_folder,
    create_org, decline_invite, delete_account, delete_file, delete_folder, delete_org,
    download_file, get_org, invite_user, list_folder, list_invites, list_members,
    list_notifications, list_orgs, login, logout, mark_all_notifications_read,
    mark_notification_read, me, prune_org, register, remove_member, rename_org, search_users,
    upload_file, AppState,
};
use super::middleware::{create_cors_layer, security_headers};

/// Slack for multipart framing on top of the configured upload size.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let body_limit = usize::try_from(app_state.max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me));

    let user_routes = Router::new()
        .route("/search", get(search_users))
        .route("/me", delete(delete_account))
        .route("/me/password", put(change_password))
        .route("/me/username", put(change_username));

    let org_routes = Router::new()
        .route("/", get(list_orgs).post(create_org))
        .route(
            "/:org_id",
            get(get_org).patch(rename_org).delete(delete_org),
        )
        .route("/:org_id/members", get(list_members))
        .route(
            "/:org_id/members/:username",
            put(change_member_role).delete(remove_member),
        )
        .route("/:org_id/invites", post(invite_user))
        .route("/:org_id/folders", get(list_folder).post(create_folder))
        .route("/:org_id/folders/:folder_id", delete(delete_folder))
        .route(
            "/:org_id/files",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/:org_id/files/:file_id", delete(delete_file))
        .route("/:org_id/files/:file_id/download", get(download_file))
        .route("/:org_id/audit", get(audit_org))
        .route("/:org_id/audit/prune", post(prune_org));

    let invite_routes = Router::new()
        .route("/", get(list_invites))
        .route("/:org_id/accept", post(accept_invite))
        .route("/:org_id/decline", post(decline_invite));

    let notification_routes = Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", post(mark_all_notifications_read))
        .route("/:id/read", post(mark_notification_read));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/orgs", org_routes)
        .nest("/invites", invite_routes)
        .nest("/notifications", notification_routes);

    Router::new()
        .nest("/api", api_routes)
        .merge(create_health_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}

/// Health check router.
pub fn create_health_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}
