//! API handlers.

pub mod auth;
pub mod file;
pub mod folder;
pub mod invite;
pub mod notification;
pub mod org;
pub mod user;

pub use auth::*;
pub use file::*;
pub use folder::*;
pub use invite::*;
pub use notification::*;
pub use org::*;
pub use user::*;

use std::sync::Arc;

use crate::auth::{SessionManager, DEFAULT_SESSION_TTL_DAYS};
use crate::file::{FileStorage, HierarchyService, DEFAULT_MAX_FILE_SIZE};
use crate::notification::NotificationRepository;
use crate::org::OrgService;
use crate::{Config, Database};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub storage: Arc<FileStorage>,
    /// Session lifetime in days.
    pub session_ttl_days: i64,
    /// Maximum upload size in bytes.
    pub max_upload_size: u64,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(db: Database, storage: FileStorage) -> Self {
        Self {
            db: Arc::new(db),
            storage: Arc::new(storage),
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            max_upload_size: DEFAULT_MAX_FILE_SIZE,
            secure_cookies: false,
        }
    }

    pub fn from_config(config: &Config, db: Database, storage: FileStorage) -> Self {
        Self::new(db, storage)
            .with_session_ttl_days(config.session.ttl_days)
            .with_max_upload_size(config.storage.max_upload_bytes())
            .with_secure_cookies(config.server.secure_cookies)
    }

    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.session_ttl_days = days;
        self
    }

    pub fn with_max_upload_size(mut self, bytes: u64) -> Self {
        self.max_upload_size = bytes;
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn sessions(&self) -> SessionManager<'_> {
        SessionManager::new(&self.db, self.session_ttl_days)
    }

    pub fn orgs(&self) -> OrgService<'_> {
        OrgService::new(&self.db, &self.storage)
    }

    pub fn hierarchy(&self) -> HierarchyService<'_> {
        HierarchyService::new(&self.db, &self.storage)
    }

    pub fn notifications(&self) -> NotificationRepository<'_> {
        NotificationRepository::new(self.db.pool())
    }
}
