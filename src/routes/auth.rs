//! Auth bootstrap endpoints. All of these are CSRF-exempt and public.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::users::password::{hash_password, password_policy_ok, verify_password};
use crate::users::{normalize_email, NewUser, Role, UserView};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CsrfResponse {
    pub csrf_token: String,
}

/// Issue a CSRF token: set the cookie and return the value for the client
/// to echo.
pub async fn issue_csrf(State(state): State<AppState>) -> Response {
    let (token, cookie) = state.csrf.issue();
    metrics::record_csrf_issued();
    (
        [(header::SET_COOKIE, cookie.to_string())],
        Json(CsrfResponse {
            csrf_token: token.value,
        }),
    )
        .into_response()
}

/// Create an unverified student account.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&body.email);
    if !looks_like_email(&email) {
        return Err(ApiError::BadRequest("A valid email address is required".into()));
    }
    if !password_policy_ok(&body.password) {
        return Err(ApiError::BadRequest(
            "Password must be 8-72 characters and contain a letter and a digit".into(),
        ));
    }

    let password_hash = hash_password(&body.password, state.config.security.bcrypt_cost).await?;
    let user = state
        .users
        .insert(NewUser {
            email,
            password_hash,
            role: Role::Student,
            email_verified: false,
        })
        .await?;
    tracing::info!(user_id = user.id, "User signed up");

    Ok((StatusCode::CREATED, Json(UserView::from(&user))).into_response())
}

/// Verify credentials and set the session cookie.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Response, ApiError> {
    let Some(user) = state.users.find_by_email(&body.email).await? else {
        // same bcrypt cost as a known account
        state.dummy_hash.verify(&body.password).await?;
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&body.password, &user.password_hash).await? {
        tracing::debug!(user_id = user.id, "Login failed: wrong password");
        return Err(ApiError::InvalidCredentials);
    }
    if !user.email_verified {
        return Err(ApiError::EmailNotVerified);
    }

    let (token, session) = state.sessions.issue(user.id, user.role)?;
    metrics::record_session_issued();
    tracing::info!(
        user_id = user.id,
        role = %user.role,
        expires_at = session.expires_at,
        "Session issued"
    );

    let cookie = state.sessions.session_cookie(token);
    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Json(UserView::from(&user)),
    )
        .into_response())
}

/// Clear the session cookie. Stateless sessions need no server-side cleanup.
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = state.sessions.clear_session_cookie();
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cookie.to_string())],
    )
        .into_response()
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
