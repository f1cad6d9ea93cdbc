//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use orgfiles::auth::SESSION_COOKIE_NAME;
use orgfiles::web::{create_router, AppState};
use orgfiles::{Database, FileStorage, User};

pub const PASSWORD: &str = "Secret123";

/// An API server over an in-memory database and a temporary storage root.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    _dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|state| state).await
}

pub async fn spawn_app_with(configure: impl FnOnce(AppState) -> AppState) -> TestApp {
    let dir = TempDir::new().expect("temp dir");
    let db = Database::open_in_memory().await.expect("in-memory database");
    let storage = FileStorage::new(dir.path().join("appdata")).expect("storage root");

    let state = Arc::new(configure(AppState::new(db, storage)));
    let router = create_router(state.clone(), &[]);
    let server = TestServer::new(router).expect("test server");

    TestApp {
        server,
        state,
        _dir: dir,
    }
}

/// `Cookie` header value carrying a session token.
pub fn cookie(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("{SESSION_COOKIE_NAME}={token}")).expect("cookie header")
}

/// Pull the session token out of a `Set-Cookie` response header.
pub fn session_token(set_cookie: &HeaderValue) -> String {
    set_cookie
        .to_str()
        .expect("ascii cookie")
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix(&format!("{SESSION_COOKIE_NAME}=")))
        .expect("session cookie")
        .to_string()
}

impl TestApp {
    /// Register a user over HTTP and return their session token.
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({ "username": username, "password": PASSWORD }))
            .await;
        response.assert_status(StatusCode::CREATED);
        session_token(&response.header(SET_COOKIE))
    }

    pub async fn create_org(&self, token: &str, name: &str) -> i64 {
        let response = self
            .server
            .post("/api/orgs")
            .add_header(COOKIE, cookie(token))
            .json(&json!({ "name": name }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"]["id"]
            .as_i64()
            .expect("org id")
    }

    /// Invite `username` into `org_id` and have them accept.
    pub async fn add_member(&self, owner: &str, org_id: i64, username: &str, member: &str) {
        self.server
            .post(&format!("/api/orgs/{org_id}/invites"))
            .add_header(COOKIE, cookie(owner))
            .json(&json!({ "username": username }))
            .await
            .assert_status(StatusCode::CREATED);
        self.server
            .post(&format!("/api/invites/{org_id}/accept"))
            .add_header(COOKIE, cookie(member))
            .await
            .assert_status_ok();
    }

    pub async fn user(&self, username: &str) -> User {
        orgfiles::UserRepository::new(self.state.db.pool())
            .get_by_username(username)
            .await
            .expect("query")
            .expect("user exists")
    }
}
