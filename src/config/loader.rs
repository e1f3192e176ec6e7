//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value {value:?} for environment variable {var}")]
    Env { var: &'static str, value: String },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then `.env`, then process
/// environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    if let Ok(env_file) = dotenvy::dotenv() {
        tracing::debug!(path = ?env_file, "Loaded .env file");
    }

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    normalize_config(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides using the variable names the deployment uses.
///
/// `lookup` abstracts the environment so overrides can be tested without
/// mutating process state.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("APP_NAME") {
        config.app_name = v;
    }
    if let Some(v) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup("SECRET_KEY") {
        config.session.secret_key = v;
    }
    if let Some(v) = lookup("SESSION_COOKIE_NAME") {
        config.session.cookie_name = v;
    }
    if let Some(v) = parsed(&lookup, "SESSION_TTL_MINUTES")? {
        config.session.ttl_minutes = v;
    }
    if let Some(v) = parsed_bool(&lookup, "SESSION_COOKIE_SECURE")? {
        config.session.secure = v;
    }
    if let Some(v) = lookup("SESSION_COOKIE_SAMESITE") {
        config.session.same_site = v;
    }
    if let Some(v) = parsed_bool(&lookup, "SESSION_ALLOW_PLACEHOLDER_SECRET")? {
        config.session.allow_placeholder_secret = v;
    }
    if let Some(v) = lookup("SESSION_COOKIE_DOMAIN") {
        config.session.domain = if v.is_empty() { None } else { Some(v) };
    }
    if let Some(v) = lookup("CSRF_COOKIE_NAME") {
        config.csrf.cookie_name = v;
    }
    if let Some(v) = parsed(&lookup, "RATE_LIMIT_PER_MINUTE")? {
        config.rate_limit.requests_per_minute = v;
    }
    if let Some(v) = parsed_bool(&lookup, "HSTS_ENABLED")? {
        config.security.hsts_enabled = v;
    }
    if let Some(v) = lookup("CORS_ORIGINS") {
        config.cors.allowed_origins = v
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(v) = lookup("ADMIN_EMAIL") {
        config.admin.email = Some(v);
    }
    if let Some(v) = lookup("ADMIN_PASSWORD") {
        config.admin.password = Some(v);
    }
    if let Some(v) = lookup("LOG_LEVEL") {
        config.observability.log_level = v;
    }
    Ok(())
}

/// Canonicalize values that may arrive in any case from TOML or the
/// environment.
pub fn normalize_config(config: &mut AppConfig) {
    config.session.same_site = config.session.same_site.trim().to_ascii_lowercase();
    config.csrf.header_name = config.csrf.header_name.trim().to_ascii_lowercase();
}

fn parsed<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
        None => Ok(None),
    }
}

fn parsed_bool<F>(lookup: &F, var: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::Env { var, value }),
        },
        None => Ok(None),
    }
}
