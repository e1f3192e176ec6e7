//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the PolyLab API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name reported by the health endpoint and logs.
    pub app_name: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Session cookie and token settings.
    pub session: SessionConfig,

    /// CSRF double-submit settings.
    pub csrf: CsrfConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Response hardening and request limits.
    pub security: SecurityConfig,

    /// Cross-origin settings for the browser frontend.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Optional seed administrator.
    pub admin: AdminConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "PolyLab API".to_string(),
            listener: ListenerConfig::default(),
            session: SessionConfig::default(),
            csrf: CsrfConfig::default(),
            rate_limit: RateLimitConfig::default(),
            security: SecurityConfig::default(),
            cors: CorsConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Default signing key. Rejected by validation unless explicitly allowed.
pub const PLACEHOLDER_SECRET: &str = "change-me";

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_MINUTES: u64 = 365 * 24 * 60;

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// HMAC key used to sign session tokens.
    pub secret_key: String,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// Fixed lifetime of a session from issuance, in minutes.
    pub ttl_minutes: u64,

    /// Set the `Secure` attribute on cookies.
    pub secure: bool,

    /// `SameSite` attribute: "strict", "lax" or "none".
    pub same_site: String,

    /// Optional `Domain` attribute.
    pub domain: Option<String>,

    /// Accept the placeholder signing key. Local development only: anyone
    /// can forge sessions with it.
    pub allow_placeholder_secret: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_key: PLACEHOLDER_SECRET.to_string(),
            cookie_name: "session_id".to_string(),
            ttl_minutes: 120,
            secure: true,
            same_site: "none".to_string(),
            domain: None,
            allow_placeholder_secret: false,
        }
    }
}

/// CSRF double-submit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Name of the script-readable CSRF cookie.
    pub cookie_name: String,

    /// Header the frontend echoes the token in.
    pub header_name: String,

    /// Body field checked when the header is absent.
    pub form_field: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: "csrf_token".to_string(),
            header_name: "x-csrf-token".to_string(),
            form_field: "csrf_token".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client per one-minute window.
    pub requests_per_minute: u32,

    /// Key anonymous clients by the first `X-Forwarded-For` entry.
    /// Only enable behind a trusted reverse proxy.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 120,
            trust_forwarded_for: false,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Emit `Strict-Transport-Security`.
    pub hsts_enabled: bool,
    /// HSTS max-age in seconds.
    pub hsts_max_age_secs: u64,
    /// Maximum body size buffered when looking for a CSRF form field.
    pub max_body_size: usize,
    /// Bcrypt cost for password hashing.
    pub bcrypt_cost: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            hsts_enabled: true,
            hsts_max_age_secs: 63_072_000, // two years
            max_body_size: 2 * 1024 * 1024, // 2MB
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to make credentialed requests.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Seed administrator created at startup when both fields are set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub email: Option<String>,
    pub password: Option<String>,
}
