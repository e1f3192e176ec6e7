//! Liveness check. Public and CSRF-exempt.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub app: String,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        app: state.config.app_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
