//! PolyLab API: request-security gateway and auth endpoints for the
//! PolyLab educational platform.

pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routes;
pub mod security;
pub mod users;

pub use config::AppConfig;
pub use error::{ApiError, PipelineError};
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
