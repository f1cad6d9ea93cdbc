//! Authentication and authorization.
//!
//! Password hashing, credential validation, cookie sessions, and the
//! role-to-capability mapping used for organisation access checks.

mod password;
pub mod permission;
mod session;
pub mod validation;

pub use password::{hash_password, verify_password, PasswordError};
pub use permission::{Capabilities, Capability, MemberRole, OrgAccess, OrgRole};
pub use session::{
    AuthenticatedUser, SessionError, SessionManager, DEFAULT_SESSION_TTL_DAYS,
    SESSION_COOKIE_NAME,
};
pub use validation::ValidationError;
