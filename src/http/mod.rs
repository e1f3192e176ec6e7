//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack)
//!     → request.rs (request ID, client address)
//!     → middleware/pipeline.rs (rate limit → session → CSRF)
//!     → routes (auth, account, mounted business routers)
//!     → response.rs (JSON errors) + security headers
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
