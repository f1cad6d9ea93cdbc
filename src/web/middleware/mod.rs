//! Extractors and layers shared by the API routes.

pub mod auth;
pub mod cors;
pub mod security;

pub use auth::{clear_session_cookie, session_cookie, CurrentUser};
pub use cors::create_cors_layer;
pub use security::security_headers;
