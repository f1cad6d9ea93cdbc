//! Request DTOs.

use serde::Deserialize;
use validator::Validate;

use crate::auth::MemberRole;
use crate::file::ParentRef;

/// Registration and login share one body.
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(length(min = 1, max = 32, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 1, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangeUsernameRequest {
    #[validate(length(min = 1, max = 32))]
    pub username: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OrgNameRequest {
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(length(min = 1, max = 32))]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: MemberRole,
}

/// `?q=` for user search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Parent folder selector, by id or by name. Neither means the root.
#[derive(Debug, Default, Deserialize)]
pub struct ParentQuery {
    pub parent_id: Option<i64>,
    pub parent: Option<String>,
}

impl ParentQuery {
    pub fn parent_ref(&self) -> ParentRef {
        match self.parent_id {
            Some(id) => ParentRef::Id(id),
            None => ParentRef::from_name(self.parent.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFolderRequest {
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub parent: Option<String>,
}

impl CreateFolderRequest {
    pub fn parent_ref(&self) -> ParentRef {
        ParentQuery {
            parent_id: self.parent_id,
            parent: self.parent.clone(),
        }
        .parent_ref()
    }
}
