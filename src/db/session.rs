//! Session repository for cookie authentication.

use super::{DbPool, User};
use crate::Result;

/// Persisted session.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Session {
    /// Opaque token carried in the session cookie.
    pub id: String,
    pub user_id: String,
    /// Expiry as unix seconds.
    pub expires_at: i64,
    pub created_at: String,
}

impl Session {
    /// A session is valid up to and including `expires_at`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

#[derive(sqlx::FromRow)]
struct SessionUserRow {
    session_id: String,
    expires_at: i64,
    session_created_at: String,
    id: String,
    username: String,
    password: String,
    created_at: String,
}

/// Repository for session operations.
pub struct SessionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a session.
    pub async fn create(&self, id: &str, user_id: &str, expires_at: i64) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, expires_at) VALUES (?, ?, ?)
             RETURNING id, user_id, expires_at, created_at",
        )
        .bind(id)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await?;
        Ok(session)
    }

    /// Look up a session together with its user.
    pub async fn get_with_user(&self, id: &str) -> Result<Option<(Session, User)>> {
        let row = sqlx::query_as::<_, SessionUserRow>(
            "SELECT s.id AS session_id, s.expires_at, s.created_at AS session_created_at,
                    u.id, u.username, u.password, u.created_at
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| {
            let session = Session {
                id: r.session_id,
                user_id: r.id.clone(),
                expires_at: r.expires_at,
                created_at: r.session_created_at,
            };
            let user = User {
                id: r.id,
                username: r.username,
                password: r.password,
                created_at: r.created_at,
            };
            (session, user)
        }))
    }

    /// Delete a session.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete sessions that expired before `now`.
    pub async fn cleanup_expired(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(now)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    async fn setup_db() -> (Database, User) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("alice", "hash"))
            .await
            .unwrap();
        (db, user)
    }

    #[tokio::test]
    async fn test_create_and_get_with_user() {
        let (db, user) = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        let session = repo.create("token-1", &user.id, 1_000).await.unwrap();
        assert_eq!(session.user_id, user.id);
        assert_eq!(session.expires_at, 1_000);

        let (found, found_user) = repo.get_with_user("token-1").await.unwrap().unwrap();
        assert_eq!(found.id, "token-1");
        assert_eq!(found_user.username, "alice");
        assert!(repo.get_with_user("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_is_expired_at_boundary() {
        let (db, user) = setup_db().await;
        let session = SessionRepository::new(db.pool())
            .create("t", &user.id, 500)
            .await
            .unwrap();
        assert!(!session.is_expired_at(499));
        assert!(!session.is_expired_at(500));
        assert!(session.is_expired_at(501));
    }

    #[tokio::test]
    async fn test_delete() {
        let (db, user) = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        repo.create("a", &user.id, 10).await.unwrap();
        repo.create("b", &user.id, 10).await.unwrap();

        assert!(repo.delete("a").await.unwrap());
        assert!(!repo.delete("a").await.unwrap());
        assert!(repo.get_with_user("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let (db, user) = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        repo.create("old", &user.id, 100).await.unwrap();
        repo.create("fresh", &user.id, 300).await.unwrap();

        assert_eq!(repo.cleanup_expired(200).await.unwrap(), 1);
        assert!(repo.get_with_user("old").await.unwrap().is_none());
        assert!(repo.get_with_user("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sessions_cascade_on_user_delete() {
        let (db, user) = setup_db().await;
        let repo = SessionRepository::new(db.pool());
        repo.create("t", &user.id, 100).await.unwrap();

        UserRepository::new(db.pool()).delete(&user.id).await.unwrap();
        assert!(repo.get_with_user("t").await.unwrap().is_none());
    }
}
