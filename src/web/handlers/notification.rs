//! Notification handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::web::dto::{ApiResponse, CountResponse, NotificationsResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// GET /api/notifications - Newest first, with the unread count.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<NotificationsResponse>>, ApiError> {
    let repo = state.notifications();
    let notifications = repo.list_for_user(current.id()).await?;
    let unread = repo.unread_count(current.id()).await?;
    Ok(Json(ApiResponse::new(NotificationsResponse {
        unread,
        notifications,
    })))
}

/// POST /api/notifications/:id/read
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.notifications().mark_read(id, current.id()).await? {
        return Err(ApiError::not_found(format!("notification {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/notifications/read-all
pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let count = state.notifications().mark_all_read(current.id()).await?;
    Ok(Json(ApiResponse::new(CountResponse { count })))
}
