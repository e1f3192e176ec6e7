//! Route handlers behind the security pipeline.
//!
//! Only the auth bootstrap and account endpoints live here; the classroom,
//! assignment, quiz, material and submission routers are mounted by the
//! caller with [`crate::http::HttpServer::with_routes`].

pub mod account;
pub mod auth;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::http::server::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/auth/csrf", get(auth::issue_csrf))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/me", get(account::me))
        .route("/admin/users", get(account::list_users))
}
