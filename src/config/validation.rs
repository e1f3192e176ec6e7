//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. Every problem is reported,
//! not just the first.

use thiserror::Error;

use crate::config::schema::{AppConfig, MAX_SESSION_TTL_MINUTES, PLACEHOLDER_SECRET};

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("session.secret_key must not be empty")]
    EmptySecret,
    #[error("session.secret_key is the published placeholder; set SECRET_KEY")]
    PlaceholderSecret,
    #[error("session.ttl_minutes must be greater than zero")]
    ZeroSessionTtl,
    #[error("session.ttl_minutes must be at most 525600, one year (got {0})")]
    SessionTtlTooLong(u64),
    #[error("session.same_site must be one of strict, lax, none (got {0:?})")]
    InvalidSameSite(String),
    #[error("session.same_site = none requires session.secure = true")]
    InsecureSameSiteNone,
    #[error("{0} must not be empty")]
    EmptyCookieName(&'static str),
    #[error("session and CSRF cookies must use different names")]
    CookieNameCollision,
    #[error("csrf.header_name {0:?} is not a valid header name")]
    InvalidHeaderName(String),
    #[error("rate_limit.requests_per_minute must be greater than zero")]
    ZeroRateLimit,
    #[error("security.bcrypt_cost must be between 4 and 31 (got {0})")]
    InvalidBcryptCost(u32),
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let session = &config.session;

    if session.secret_key.is_empty() {
        errors.push(ValidationError::EmptySecret);
    } else if session.secret_key == PLACEHOLDER_SECRET {
        if session.allow_placeholder_secret {
            tracing::warn!("session.secret_key is the placeholder; sessions can be forged");
        } else {
            errors.push(ValidationError::PlaceholderSecret);
        }
    }
    if session.ttl_minutes == 0 {
        errors.push(ValidationError::ZeroSessionTtl);
    } else if session.ttl_minutes > MAX_SESSION_TTL_MINUTES {
        errors.push(ValidationError::SessionTtlTooLong(session.ttl_minutes));
    }
    match session.same_site.as_str() {
        "strict" | "lax" => {}
        "none" => {
            if !session.secure {
                errors.push(ValidationError::InsecureSameSiteNone);
            }
        }
        other => errors.push(ValidationError::InvalidSameSite(other.to_string())),
    }
    if session.cookie_name.is_empty() {
        errors.push(ValidationError::EmptyCookieName("session.cookie_name"));
    }
    if config.csrf.cookie_name.is_empty() {
        errors.push(ValidationError::EmptyCookieName("csrf.cookie_name"));
    }
    if !session.cookie_name.is_empty() && session.cookie_name == config.csrf.cookie_name {
        errors.push(ValidationError::CookieNameCollision);
    }
    if axum::http::HeaderName::from_bytes(config.csrf.header_name.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName(config.csrf.header_name.clone()));
    }
    if config.rate_limit.requests_per_minute == 0 {
        errors.push(ValidationError::ZeroRateLimit);
    }
    if !(4..=31).contains(&config.security.bcrypt_cost) {
        errors.push(ValidationError::InvalidBcryptCost(config.security.bcrypt_cost));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
