//! Double-submit CSRF protection.
//!
//! The token lives in a script-readable cookie; same-origin JavaScript
//! copies it into a header (or a body field) on every state-changing
//! request. A cross-origin page can make the browser send the cookie but
//! cannot read it, so it cannot produce the matching copy.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, Request},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cookie::Cookie;
use rand::RngCore;

use crate::clock::Clock;
use crate::config::{CsrfConfig, SessionConfig};
use crate::error::PipelineError;
use crate::security::cookies::{read_cookie, CookieAttributes};

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;

/// CSRF cookie lifetime. The cookie outlives any single session.
const COOKIE_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub value: String,
    pub issued_at: u64,
}

/// Issues and checks double-submit token pairs.
pub struct CsrfGuard {
    cookie_name: String,
    header_name: HeaderName,
    form_field: String,
    cookie: CookieAttributes,
    clock: Arc<dyn Clock>,
}

impl CsrfGuard {
    /// Cookie attributes follow the session cookie so both reach the API
    /// under the same cross-site rules.
    pub fn new(csrf: &CsrfConfig, session: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            cookie_name: csrf.cookie_name.clone(),
            header_name: HeaderName::from_bytes(csrf.header_name.as_bytes())
                .unwrap_or_else(|_| HeaderName::from_static("x-csrf-token")),
            form_field: csrf.form_field.clone(),
            cookie: CookieAttributes::new(session.secure, &session.same_site, session.domain.clone()),
            clock,
        }
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Generate a token and the (non-HttpOnly) cookie carrying it.
    pub fn issue(&self) -> (CsrfToken, Cookie<'static>) {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = CsrfToken {
            value: URL_SAFE_NO_PAD.encode(bytes),
            issued_at: self.clock.now(),
        };
        let cookie = self
            .cookie
            .build(&self.cookie_name, token.value.clone(), false, COOKIE_MAX_AGE_SECS);
        (token, cookie)
    }

    /// Check that the cookie token and the submitted copy are both present
    /// and identical. The header copy wins over `body_token`.
    pub fn validate(&self, headers: &HeaderMap, body_token: Option<&str>) -> Result<(), PipelineError> {
        let cookie_token = read_cookie(headers, &self.cookie_name).filter(|t| !t.is_empty());
        let submitted = self
            .header_token(headers)
            .or_else(|| body_token.map(str::to_string))
            .filter(|t| !t.is_empty());

        match (cookie_token, submitted) {
            (Some(cookie), Some(submitted)) if constant_time_eq(cookie.as_bytes(), submitted.as_bytes()) => {
                Ok(())
            }
            _ => Err(PipelineError::CsrfMismatch),
        }
    }

    fn header_token(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(&self.header_name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
    }

    /// Whether the token has to be looked for in the body: no header copy
    /// and a form or JSON content type.
    pub fn needs_body_token(&self, headers: &HeaderMap) -> bool {
        self.header_token(headers).is_none() && body_kind(headers).is_some()
    }

    /// Buffer the body (up to `limit` bytes), pull out the token field, and
    /// hand back a request whose body is intact for the handler.
    pub async fn extract_body_token(
        &self,
        request: Request<Body>,
        limit: usize,
    ) -> (Request<Body>, Option<String>) {
        let Some(kind) = body_kind(request.headers()) else {
            return (request, None);
        };
        let (parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, limit).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Could not buffer body for CSRF field");
                return (Request::from_parts(parts, Body::empty()), None);
            }
        };
        let token = self.field_from_body(kind, &bytes);
        (Request::from_parts(parts, Body::from(bytes)), token)
    }

    fn field_from_body(&self, kind: BodyKind, bytes: &Bytes) -> Option<String> {
        match kind {
            BodyKind::Form => url::form_urlencoded::parse(bytes)
                .find(|(key, _)| key == self.form_field.as_str())
                .map(|(_, value)| value.into_owned()),
            BodyKind::Json => serde_json::from_slice::<serde_json::Value>(bytes)
                .ok()?
                .get(&self.form_field)?
                .as_str()
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Form,
    Json,
}

fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "application/x-www-form-urlencoded" => Some(BodyKind::Form),
        "application/json" => Some(BodyKind::Json),
        _ => None,
    }
}

/// Equality whose running time depends only on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
