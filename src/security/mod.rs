//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (fixed window per client key)
//!     → session.rs (signed cookie → Identity), unless a public route
//!     → csrf.rs (cookie/header double submit), unless CSRF-exempt
//!     → Pass to route handler
//!
//! Every response:
//!     → headers.rs (nosniff, frame, referrer, HSTS)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Exemptions are declarative tables (exemptions.rs), not ad hoc checks
//! - Time comes from an injected clock so expiry and windows are testable

pub mod cookies;
pub mod csrf;
pub mod exemptions;
pub mod headers;
pub mod rate_limit;
pub mod session;

pub use csrf::{CsrfGuard, CsrfToken};
pub use exemptions::{ExemptionRule, ExemptionTable, MethodSet, PathPattern};
pub use rate_limit::{RateLimiter, RateWindow};
pub use session::{Identity, Session, SessionAuthenticator};
