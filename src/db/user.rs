//! User model.

use serde::Serialize;

/// Registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    /// Opaque identifier (UUID v4).
    pub id: String,
    pub username: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: String,
}

/// New user for insertion. `password` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub username: String,
    pub password: String,
}

impl NewUser {
    /// Create a new user record with a freshly generated id.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            password: password_hash.into(),
        }
    }
}
