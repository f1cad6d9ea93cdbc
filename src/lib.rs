//! orgfiles - multi-tenant file management service
//!
//! Organisations own a tree of folders and files that is mirrored on disk
//! as `org-{id}/folder-{id}/.../file-{id}`. Members are invited, hold a role
//! in each organisation they join, and receive notifications about changes.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod notification;
pub mod org;
pub mod web;

pub use auth::{
    hash_password, verify_password, AuthenticatedUser, Capabilities, Capability, MemberRole,
    OrgAccess, OrgRole, PasswordError, SessionError, SessionManager, ValidationError,
};
pub use config::Config;
pub use db::{Database, NewUser, Session, User, UserRepository};
pub use error::{FmsError, Result};
pub use file::{
    AuditReport, FileRecord, FileStorage, Folder, FolderListing, HierarchyService, ParentRef,
    Upload,
};
pub use notification::{Notification, NotificationKind, NotificationRepository};
pub use org::{OrgService, Organisation};
pub use web::WebServer;
