//! HTTP API.
//!
//! Thin axum glue over the services: cookie session authentication,
//! JSON bodies wrapped as `{"data": ...}`, multipart uploads and
//! attachment downloads.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
