//! Session management for cookie-based authentication.
//!
//! Sessions are rows in the `sessions` table keyed by an opaque UUID token.
//! Expiry is fixed at creation and checked when the cookie is presented.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use super::password::{hash_password, verify_password};
use super::validation::{validate_password, validate_username};
use crate::db::{NewUser, Session, SessionRepository, User, UserRepository};
use crate::file::FileStorage;
use crate::org::OrgRepository;
use crate::{Database, FmsError, Result};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "session_token";

/// Default session lifetime in days.
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Authentication failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("missing session cookie")]
    MissingCookie,

    #[error("invalid session cookie")]
    InvalidCookie,

    #[error("session expired")]
    Expired,

    #[error("invalid username or password")]
    InvalidCredentials,
}

/// A user authenticated by a live session.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub session: Session,
}

/// Account and session operations.
pub struct SessionManager<'a> {
    db: &'a Database,
    ttl_secs: i64,
}

impl<'a> SessionManager<'a> {
    /// Create a manager issuing sessions that last `ttl_days`.
    pub fn new(db: &'a Database, ttl_days: i64) -> Self {
        Self {
            db,
            ttl_secs: ttl_days * SECS_PER_DAY,
        }
    }

    /// Session lifetime in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Register a user and open a session for them.
    pub async fn register(&self, username: &str, password: &str) -> Result<(User, Session)> {
        validate_username(username)?;
        validate_password(password)?;

        let users = UserRepository::new(self.db.pool());
        if users.username_exists(username).await? {
            return Err(FmsError::AlreadyExists(format!("username '{username}'")));
        }

        let hash = hash_password(password).map_err(|e| FmsError::Internal(e.to_string()))?;
        let user = users.create(&NewUser::new(username, hash)).await?;
        let session = self.create_session(&user.id).await?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok((user, session))
    }

    /// Verify credentials and open a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, Session)> {
        let user = UserRepository::new(self.db.pool())
            .get_by_username(username)
            .await?
            .ok_or(SessionError::InvalidCredentials)?;

        if verify_password(password, &user.password).is_err() {
            return Err(SessionError::InvalidCredentials.into());
        }

        let session = self.create_session(&user.id).await?;
        info!(user_id = %user.id, "user logged in");
        Ok((user, session))
    }

    /// Issue a session expiring `ttl` from now.
    pub async fn create_session(&self, user_id: &str) -> Result<Session> {
        self.create_session_at(user_id, Utc::now().timestamp()).await
    }

    /// Issue a session expiring `ttl` from `now` (unix seconds).
    pub async fn create_session_at(&self, user_id: &str, now: i64) -> Result<Session> {
        let token = uuid::Uuid::new_v4().to_string();
        SessionRepository::new(self.db.pool())
            .create(&token, user_id, now + self.ttl_secs)
            .await
    }

    /// Authenticate a cookie token against the current time.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<AuthenticatedUser> {
        self.authenticate_at(token, Utc::now().timestamp()).await
    }

    /// Authenticate a cookie token at `now` (unix seconds).
    pub async fn authenticate_at(&self, token: Option<&str>, now: i64) -> Result<AuthenticatedUser> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingCookie)?;

        let (session, user) = SessionRepository::new(self.db.pool())
            .get_with_user(token)
            .await?
            .ok_or(SessionError::InvalidCookie)?;

        if session.is_expired_at(now) {
            return Err(SessionError::Expired.into());
        }

        Ok(AuthenticatedUser { user, session })
    }

    /// End a session. Returns false if the token was unknown.
    pub async fn logout(&self, token: &str) -> Result<bool> {
        SessionRepository::new(self.db.pool()).delete(token).await
    }

    /// Change a password after verifying the current one.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let users = UserRepository::new(self.db.pool());
        let user = users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| FmsError::NotFound("user".into()))?;

        if verify_password(current_password, &user.password).is_err() {
            return Err(SessionError::InvalidCredentials.into());
        }
        validate_password(new_password)?;

        let hash = hash_password(new_password).map_err(|e| FmsError::Internal(e.to_string()))?;
        users.update_password(user_id, &hash).await?;
        info!(user_id, "password changed");
        Ok(())
    }

    /// Change a username.
    pub async fn change_username(&self, user_id: &str, new_username: &str) -> Result<User> {
        validate_username(new_username)?;

        let users = UserRepository::new(self.db.pool());
        if users.username_exists(new_username).await? {
            return Err(FmsError::AlreadyExists(format!("username '{new_username}'")));
        }
        if !users.update_username(user_id, new_username).await? {
            return Err(FmsError::NotFound("user".into()));
        }

        users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| FmsError::NotFound("user".into()))
    }

    /// Delete an account.
    ///
    /// Rows owned by the user go with it through foreign-key cascades. The
    /// owned organisation's directory tree is removed afterwards; failures
    /// there are logged only.
    pub async fn delete_account(&self, user_id: &str, storage: &FileStorage) -> Result<()> {
        let owned = OrgRepository::new(self.db.pool())
            .get_by_creator(user_id)
            .await?;

        if !UserRepository::new(self.db.pool()).delete(user_id).await? {
            return Err(FmsError::NotFound("user".into()));
        }

        if let Some(org) = owned {
            if let Err(e) = storage.remove_org_dir(org.id).await {
                warn!(org_id = org.id, error = %e, "failed to remove organisation directory");
            }
        }

        info!(user_id, "account deleted");
        Ok(())
    }

    /// Delete every session that has already expired.
    pub async fn purge_expired(&self) -> Result<u64> {
        SessionRepository::new(self.db.pool())
            .cleanup_expired(Utc::now().timestamp())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_register_creates_session() {
        let db = setup_db().await;
        let manager = SessionManager::new(&db, DEFAULT_SESSION_TTL_DAYS);

        let (user, session) = manager.register("alice", "Secret123").await.unwrap();
        assert_eq!(user.username, "alice");
        assert_ne!(user.password, "Secret123");
        assert_eq!(session.user_id, user.id);

        let auth = manager.authenticate(Some(&session.id)).await.unwrap();
        assert_eq!(auth.user.id, user.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let db = setup_db().await;
        let manager = SessionManager::new(&db, DEFAULT_SESSION_TTL_DAYS);

        manager.register("alice", "Secret123").await.unwrap();
        let result = manager.register("alice", "Another123").await;
        assert!(matches!(result, Err(FmsError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let db = setup_db().await;
        let manager = SessionManager::new(&db, DEFAULT_SESSION_TTL_DAYS);

        assert!(matches!(
            manager.register("a", "Secret123").await,
            Err(FmsError::Validation(_))
        ));
        assert!(matches!(
            manager.register("alice", "short").await,
            Err(FmsError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_login() {
        let db = setup_db().await;
        let manager = SessionManager::new(&db, DEFAULT_SESSION_TTL_DAYS);
        manager.register("alice", "Secret123").await.unwrap();

        let (user, session) = manager.login("alice", "Secret123").await.unwrap();
        assert_eq!(session.user_id, user.id);

        let wrong = manager.login("alice", "Wrong1234").await;
        assert!(matches!(
            wrong,
            Err(FmsError::Unauthorized(SessionError::InvalidCredentials))
        ));

        let unknown = manager.login("nobody", "Secret123").await;
        assert!(matches!(
            unknown,
            Err(FmsError::Unauthorized(SessionError::InvalidCredentials))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_missing_and_invalid() {
        let db = setup_db().await;
        let manager = SessionManager::new(&db, DEFAULT_SESSION_TTL_DAYS);

        assert!(matches!(
            manager.authenticate(None).await,
            Err(FmsError::Unauthorized(SessionError::MissingCookie))
        ));
        assert!(matches!(
            manager.authenticate(Some("")).await,
            Err(FmsError::Unauthorized(SessionError::MissingCookie))
        ));
        assert!(matches!(
            manager.authenticate(Some("no-such-token")).await,
            Err(FmsError::Unauthorized(SessionError::InvalidCookie))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_expiry_boundary() {
        let db = setup_db().await;
        let manager = SessionManager::new(&db, 7);
        let (user, _) = manager.register("alice", "Secret123").await.unwrap();

        let issued_at = 1_700_000_000;
        let session = manager.create_session_at(&user.id, issued_at).await.unwrap();
        let expires_at = issued_at + 7 * SECS_PER_DAY;
        assert_eq!(session.expires_at, expires_at);

        let at_expiry = manager
            .authenticate_at(Some(&session.id), expires_at)
            .await
            .unwrap();
        assert_eq!(at_expiry.user.username, "alice");

        let after = manager
            .authenticate_at(Some(&session.id), expires_at + 1)
            .await;
        assert!(matches!(
            after,
            Err(FmsError::Unauthorized(SessionError::Expired))
        ));
    }

    #[tokio::test]
    async fn test_logout() {
        let db = setup_db().await;
        let manager = SessionManager::new(&db, DEFAULT_SESSION_TTL_DAYS);
        let (_, session) = manager.register("alice", "Secret123").await.unwrap();

        assert!(manager.logout(&session.id).await.unwrap());
        assert!(matches!(
            manager.authenticate(Some(&session.id)).await,
            Err(FmsError::Unauthorized(SessionError::InvalidCookie))
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let db = setup_db().await;
        let manager = SessionManager::new(&db, DEFAULT_SESSION_TTL_DAYS);
        let (user, _) = manager.register("alice", "Secret123").await.unwrap();

        let wrong = manager
            .change_password(&user.id, "Nope12345", "NewSecret1")
            .await;
        assert!(matches!(wrong, Err(FmsError::Unauthorized(_))));

        manager
            .change_password(&user.id, "Secret123", "NewSecret1")
            .await
            .unwrap();
        assert!(manager.login("alice", "Secret123").await.is_err());
        assert!(manager.login("alice", "NewSecret1").await.is_ok());
    }

    #[tokio::test]
    async fn test_change_username() {
        let db = setup_db().await;
        let manager = SessionManager::new(&db, DEFAULT_SESSION_TTL_DAYS);
        let (alice, _) = manager.register("alice", "Secret123").await.unwrap();
        manager.register("bob", "Secret123").await.unwrap();

        let taken = manager.change_username(&alice.id, "bob").await;
        assert!(matches!(taken, Err(FmsError::AlreadyExists(_))));

        let renamed = manager.change_username(&alice.id, "alicia").await.unwrap();
        assert_eq!(renamed.username, "alicia");
    }

    #[tokio::test]
    async fn test_delete_account_removes_owned_org() {
        let db = setup_db().await;
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let manager = SessionManager::new(&db, DEFAULT_SESSION_TTL_DAYS);
        let (user, session) = manager.register("alice", "Secret123").await.unwrap();

        let org = crate::org::OrgService::new(&db, &storage)
            .create_org(&user.id, "Acme")
            .await
            .unwrap();
        assert!(dir.path().join(format!("org-{}", org.id)).is_dir());

        manager.delete_account(&user.id, &storage).await.unwrap();

        assert!(!dir.path().join(format!("org-{}", org.id)).exists());
        assert!(OrgRepository::new(db.pool())
            .get_by_id(org.id)
            .await
            .unwrap()
            .is_none());
        assert!(manager.authenticate(Some(&session.id)).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let db = setup_db().await;
        let manager = SessionManager::new(&db, 1);
        let (user, live) = manager.register("alice", "Secret123").await.unwrap();
        let stale = manager.create_session_at(&user.id, 0).await.unwrap();

        assert_eq!(manager.purge_expired().await.unwrap(), 1);
        assert!(manager.authenticate(Some(&live.id)).await.is_ok());
        assert!(manager.authenticate(Some(&stale.id)).await.is_err());
    }
}
