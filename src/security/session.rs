//! Signed session tokens carried in a cookie.
//!
//! # Responsibilities
//! - Issue an HS256-signed token at login
//! - Resolve a cookie value to an [`Identity`] (signature, then expiry)
//! - Build the session `Set-Cookie` values
//!
//! # Design Decisions
//! - Stateless: the token is self-contained, nothing is stored server-side
//! - Fixed expiry: `exp = iat + ttl`, never extended by activity
//! - Expiry is checked against the injected [`Clock`], not the library's
//!   own wall-clock check, so a bad signature is always `InvalidSession`
//!   and an elapsed TTL always `SessionExpired`

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use cookie::Cookie;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::PipelineError;
use crate::security::cookies::{read_cookie, CookieAttributes};
use crate::users::{Role, UserId};

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    sid: String,
    sub: UserId,
    role: Role,
    iat: u64,
    exp: u64,
}

/// A session as issued at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub user_id: UserId,
    pub role: Role,
    pub expires_at: u64,
}

/// The authenticated caller, attached to request extensions by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub session_id: String,
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    /// Fail with `Forbidden` unless the caller holds one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), PipelineError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(PipelineError::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = PipelineError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(PipelineError::MissingSession)
    }
}

/// Issues and verifies session tokens.
pub struct SessionAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
    cookie_name: String,
    cookie: CookieAttributes,
    clock: Arc<dyn Clock>,
}

impl SessionAuthenticator {
    pub fn new(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            validation,
            ttl_secs: config.ttl_minutes.saturating_mul(60),
            cookie_name: config.cookie_name.clone(),
            cookie: CookieAttributes::new(config.secure, &config.same_site, config.domain.clone()),
            clock,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Create a signed token for a freshly authenticated user.
    pub fn issue(
        &self,
        user_id: UserId,
        role: Role,
    ) -> Result<(String, Session), jsonwebtoken::errors::Error> {
        let now = self.clock.now();
        let claims = SessionClaims {
            sid: Uuid::new_v4().to_string(),
            sub: user_id,
            role,
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok((
            token,
            Session {
                session_id: claims.sid,
                user_id,
                role,
                expires_at: claims.exp,
            },
        ))
    }

    /// Verify a token's signature and expiry.
    pub fn resolve(&self, token: &str) -> Result<Identity, PipelineError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                tracing::debug!(error = %e, "Rejected session token");
                PipelineError::InvalidSession
            },
        )?;
        let claims = data.claims;

        if self.clock.now() >= claims.exp {
            return Err(PipelineError::SessionExpired);
        }

        Ok(Identity {
            session_id: claims.sid,
            user_id: claims.sub,
            role: claims.role,
        })
    }

    /// The raw session token from the request's cookies, if present.
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        read_cookie(headers, &self.cookie_name).filter(|token| !token.is_empty())
    }

    /// HttpOnly cookie carrying `token`, living as long as the session.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let max_age = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        self.cookie
            .build(&self.cookie_name, token, true, max_age)
    }

    /// Expired, empty session cookie used on logout.
    pub fn clear_session_cookie(&self) -> Cookie<'static> {
        self.cookie.build(&self.cookie_name, String::new(), true, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn authenticator(ttl_minutes: u64) -> (SessionAuthenticator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let config = SessionConfig {
            secret_key: "test-secret".into(),
            ttl_minutes,
            ..SessionConfig::default()
        };
        (SessionAuthenticator::new(&config, clock.clone()), clock)
    }

    #[test]
    fn issue_then_resolve() {
        let (auth, _) = authenticator(120);
        let (token, session) = auth.issue(7, Role::Instructor).unwrap();
        assert_eq!(session.expires_at, 1_700_000_000 + 120 * 60);

        let identity = auth.resolve(&token).unwrap();
        assert_eq!(identity.user_id, 7);
        assert_eq!(identity.role, Role::Instructor);
        assert_eq!(identity.session_id, session.session_id);
    }

    #[test]
    fn expires_after_fixed_ttl() {
        let (auth, clock) = authenticator(1);
        let (token, _) = auth.issue(1, Role::Student).unwrap();

        clock.advance(Duration::from_secs(59));
        assert!(auth.resolve(&token).is_ok());

        // minute two
        clock.advance(Duration::from_secs(61));
        assert_eq!(auth.resolve(&token), Err(PipelineError::SessionExpired));
    }

    #[test]
    fn rejects_foreign_signature_and_garbage() {
        let (auth, clock) = authenticator(120);
        let other = SessionAuthenticator::new(
            &SessionConfig {
                secret_key: "another-secret".into(),
                ..SessionConfig::default()
            },
            clock,
        );
        let (forged, _) = other.issue(1, Role::Admin).unwrap();

        assert_eq!(auth.resolve(&forged), Err(PipelineError::InvalidSession));
        assert_eq!(auth.resolve("not-a-token"), Err(PipelineError::InvalidSession));
        assert_eq!(auth.resolve(""), Err(PipelineError::InvalidSession));
    }

    #[test]
    fn oversized_ttl_saturates() {
        let (auth, _) = authenticator(u64::MAX / 60);
        let (token, session) = auth.issue(3, Role::Student).unwrap();
        assert_eq!(session.expires_at, u64::MAX);
        assert_eq!(auth.resolve(&token).unwrap().user_id, 3);

        let cookie = auth.session_cookie(token);
        assert!(cookie.max_age().unwrap().is_positive());
    }

    #[test]
    fn require_role() {
        let identity = Identity {
            session_id: "s".into(),
            user_id: 1,
            role: Role::Student,
        };
        assert!(identity.require_role(&[Role::Student, Role::Admin]).is_ok());
        assert_eq!(identity.require_role(&[Role::Admin]), Err(PipelineError::Forbidden));
    }

    #[test]
    fn cookies() {
        let (auth, _) = authenticator(120);
        let cookie = auth.session_cookie("tok".into());
        assert_eq!(cookie.name(), "session_id");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::seconds(7200)));

        let cleared = auth.clear_session_cookie();
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.max_age(), Some(cookie::time::Duration::ZERO));
    }
}
