//! Response DTOs.

use serde::Serialize;

use crate::auth::{Capabilities, OrgRole};
use crate::db::User;
use crate::notification::Notification;
use crate::org::{JoinedOrg, Organisation};

/// Generic API response wrapper: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// Response for `/api/auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserInfo,
    pub owned_org: Option<Organisation>,
    pub joined_orgs: Vec<JoinedOrg>,
    pub unread_notifications: i64,
    /// Unix timestamp at which the current session ends.
    pub session_expires_at: i64,
}

/// The caller's organisations.
#[derive(Debug, Serialize)]
pub struct OrgListResponse {
    pub owned: Option<Organisation>,
    pub joined: Vec<JoinedOrg>,
}

/// An organisation with the caller's role in it.
#[derive(Debug, Serialize)]
pub struct OrgResponse {
    #[serde(flatten)]
    pub org: Organisation,
    pub role: OrgRole,
    pub capabilities: Capabilities,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub unread: i64,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}
