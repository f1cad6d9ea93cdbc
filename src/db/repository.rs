//! User repository.

use super::{map_insert_error, DbPool, NewUser, User};
use crate::{FmsError, Result};

/// Maximum number of results returned by [`UserRepository::search`].
pub const USER_SEARCH_LIMIT: i64 = 20;

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a user. Duplicate usernames fail with `AlreadyExists`.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        sqlx::query("INSERT INTO users (id, username, password) VALUES (?, ?, ?)")
            .bind(&new_user.id)
            .bind(&new_user.username)
            .bind(&new_user.password)
            .execute(self.pool)
            .await
            .map_err(|e| map_insert_error(e, format!("username '{}'", new_user.username)))?;

        self.get_by_id(&new_user.id)
            .await?
            .ok_or_else(|| FmsError::NotFound("user".into()))
    }

    /// Get a user by id.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by exact (case-sensitive) username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Check whether a username is taken.
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Case-insensitive prefix search on usernames, excluding `exclude_id`.
    pub async fn search(&self, prefix: &str, exclude_id: &str) -> Result<Vec<User>> {
        let pattern = format!("{}%", escape_like(prefix));
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, password, created_at FROM users
             WHERE username LIKE ? ESCAPE '\\' AND id != ?
             ORDER BY username COLLATE NOCASE
             LIMIT ?",
        )
        .bind(pattern)
        .bind(exclude_id)
        .bind(USER_SEARCH_LIMIT)
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    /// Change a username. Returns false if the user does not exist.
    pub async fn update_username(&self, id: &str, username: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET username = ? WHERE id = ?")
            .bind(username)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_insert_error(e, format!("username '{username}'")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the stored password hash.
    pub async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user. Sessions, memberships, invites and the owned
    /// organisation are removed by foreign-key cascade.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Escape `%`, `_` and `\` for a LIKE pattern using `\` as escape character.
fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
