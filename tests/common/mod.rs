//! Shared helpers for in-process integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    routing::post,
    Router,
};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use polylab_api::clock::ManualClock;
use polylab_api::config::AppConfig;
use polylab_api::http::AppState;
use polylab_api::users::password::hash_password;
use polylab_api::users::{InMemoryUserStore, NewUser, Role, User, UserStore};
use polylab_api::HttpServer;

pub const START: u64 = 1_700_000_000;
pub const PASSWORD: &str = "correct1horse";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub users: Arc<InMemoryUserStore>,
    /// Times the mounted `/classrooms` handler actually ran.
    pub handler_calls: Arc<AtomicUsize>,
}

/// Config suited to tests: cheap bcrypt, generous rate limit.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.session.secret_key = "integration-secret".into();
    config.security.bcrypt_cost = 4;
    config.rate_limit.requests_per_minute = 1_000;
    config
}

pub fn spawn_app(config: AppConfig) -> TestApp {
    let clock = Arc::new(ManualClock::new(START));
    let users = Arc::new(InMemoryUserStore::new());
    let handler_calls = Arc::new(AtomicUsize::new(0));

    let calls = handler_calls.clone();
    let business: Router<AppState> = Router::new()
        .route(
            "/classrooms",
            post(move |body: String| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::CREATED, body)
                }
            }),
        );

    let server = HttpServer::with_routes(config, users.clone(), clock.clone(), business);
    TestApp {
        router: server.router(),
        state: server.state().clone(),
        clock,
        users,
        handler_calls,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn calls(&self) -> usize {
        self.handler_calls.load(Ordering::SeqCst)
    }

    pub async fn create_user(&self, email: &str, role: Role, verified: bool) -> User {
        self.users
            .insert(NewUser {
                email: email.into(),
                password_hash: hash_password(PASSWORD, 4).await.unwrap(),
                role,
                email_verified: verified,
            })
            .await
            .unwrap()
    }

    /// Log in and return the session cookie value.
    pub async fn login(&self, email: &str) -> String {
        let resp = self
            .send(json_request(
                "POST",
                "/auth/login",
                &format!(r#"{{"email":"{email}","password":"{PASSWORD}"}}"#),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        set_cookie(&resp, "session_id").expect("login sets the session cookie")
    }

    /// Fetch a CSRF token; the cookie and body carry the same value.
    pub async fn csrf_token(&self) -> String {
        let resp = self
            .send(Request::get("/auth/csrf").body(Body::empty()).unwrap())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = set_cookie(&resp, "csrf_token").expect("csrf cookie");
        let body: serde_json::Value = json_body(resp).await;
        assert_eq!(body["csrf_token"], cookie.as_str());
        cookie
    }
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A request carrying the given cookies and optional CSRF header.
pub fn authed(
    method: &str,
    uri: &str,
    session: Option<&str>,
    csrf_cookie: Option<&str>,
    csrf_header: Option<&str>,
) -> Request<Body> {
    let mut cookies = Vec::new();
    if let Some(s) = session {
        cookies.push(format!("session_id={s}"));
    }
    if let Some(c) = csrf_cookie {
        cookies.push(format!("csrf_token={c}"));
    }

    let mut builder = Request::builder().method(method).uri(uri);
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies.join("; "));
    }
    if let Some(h) = csrf_header {
        builder = builder.header("x-csrf-token", h);
    }
    builder.body(Body::from("payload")).unwrap()
}

/// Value of the `Set-Cookie` named `name`.
pub fn set_cookie(resp: &Response, name: &str) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| cookie::Cookie::parse(v.to_string()).ok())
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

pub async fn json_body<T: DeserializeOwned>(resp: Response) -> T {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `code` field of an error response.
pub async fn error_code(resp: Response) -> String {
    let body: serde_json::Value = json_body(resp).await;
    body["code"].as_str().unwrap_or_default().to_string()
}

pub fn assert_security_headers(resp: &Response) {
    let headers = resp.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert!(headers.contains_key("strict-transport-security"));
}
