//! Organisations, memberships and invites.

mod repository;
mod service;

use serde::Serialize;

use crate::auth::MemberRole;

pub use repository::OrgRepository;
pub use service::OrgService;

/// Maximum number of organisations a user may join as a member.
pub const MAX_JOINED_ORGS: i64 = 3;

/// Maximum organisation name length (in characters).
pub const MAX_ORG_NAME_LENGTH: usize = 64;

/// Organisation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Organisation {
    pub id: i64,
    pub name: String,
    pub creator_id: String,
    pub created_at: String,
}

/// Membership with the member's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrgMember {
    pub org_id: i64,
    pub user_id: String,
    pub username: String,
    #[sqlx(try_from = "String")]
    pub role: MemberRole,
    pub joined_at: String,
}

/// Organisation the user joined, with their role there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct JoinedOrg {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub org: Organisation,
    #[sqlx(try_from = "String")]
    pub role: MemberRole,
}

/// Pending invite addressed to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrgInvite {
    pub org_id: i64,
    pub org_name: String,
    pub user_id: String,
    pub invited_at: String,
}
