//! The request-security pipeline.
//!
//! Stages run in a fixed order and the first failure short-circuits:
//!
//! ```text
//! OPTIONS ───────────────────────────────────────────────▶ next
//! other   → rate limit → session (unless public) → CSRF (unless exempt) → next
//! ```
//!
//! Rate limiting runs before any stage can reject, so even requests that
//! will fail authentication are counted. The session stage runs before
//! CSRF so a caller without a session always sees 401.
//!
//! The session cookie is HMAC-verified once, up front, because the rate
//! key depends on it: `user:<id>` for a verified session, `ip:<addr>`
//! otherwise. That verification is one SHA-256 over a short token and is
//! paid by over-budget requests too. Keying on unverified claims would let
//! a client charge its traffic to another user's budget, so the cost is
//! accepted.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::PipelineError;
use crate::http::request::{client_addr, request_id};
use crate::observability::metrics;
use crate::security::{CsrfGuard, ExemptionTable, Identity, RateLimiter, SessionAuthenticator};

/// Everything the pipeline needs, injected at router construction.
#[derive(Clone)]
pub struct PipelineState {
    /// `None` when rate limiting is disabled.
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub sessions: Arc<SessionAuthenticator>,
    pub csrf: Arc<CsrfGuard>,
    /// Routes reachable without a session.
    pub public_routes: Arc<ExemptionTable>,
    /// Requests that skip CSRF enforcement.
    pub csrf_exempt: Arc<ExemptionTable>,
    /// Largest body buffered when looking for a CSRF body field.
    pub body_limit: usize,
    pub trust_forwarded_for: bool,
}

impl PipelineState {
    /// Run every stage. On success returns the request, possibly with a
    /// re-attached body and an [`Identity`] extension.
    pub async fn admit(&self, mut request: Request<Body>) -> Result<Request<Body>, PipelineError> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let resolved = self
            .sessions
            .token_from_headers(request.headers())
            .map(|token| self.sessions.resolve(&token));

        if let Some(limiter) = &self.rate_limiter {
            let key = match &resolved {
                Some(Ok(identity)) => format!("user:{}", identity.user_id),
                _ => format!("ip:{}", client_addr(&request, self.trust_forwarded_for)),
            };
            limiter.check(&key).inspect_err(|_| {
                tracing::warn!(client = %key, method = %method, path = %path, "Rate limit exceeded");
            })?;
        }

        if self.public_routes.matches(&method, &path) {
            if let Some(Ok(identity)) = resolved {
                request.extensions_mut().insert(identity);
            }
        } else {
            let identity: Identity = resolved.unwrap_or(Err(PipelineError::MissingSession))?;
            tracing::trace!(user_id = identity.user_id, role = %identity.role, "Session resolved");
            request.extensions_mut().insert(identity);
        }

        if !self.csrf_exempt.matches(&method, &path) {
            let (req, body_token) = if self.csrf.needs_body_token(request.headers()) {
                self.csrf.extract_body_token(request, self.body_limit).await
            } else {
                (request, None)
            };
            request = req;
            self.csrf.validate(request.headers(), body_token.as_deref())?;
        }

        Ok(request)
    }
}

/// Axum middleware wrapping [`PipelineState::admit`].
pub async fn request_pipeline(
    State(state): State<PipelineState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Preflight must always reach the CORS layer untouched.
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let request_id = request_id(&request).to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match state.admit(request).await {
        Ok(request) => next.run(request).await,
        Err(rejection) => {
            tracing::debug!(
                request_id = %request_id,
                method = %method,
                path = %path,
                code = rejection.code(),
                "Request rejected by pipeline"
            );
            metrics::record_rejection(rejection.stage());
            rejection.into_response()
        }
    }
}
