//! Endpoints for the signed-in caller and administrators.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, PipelineError};
use crate::http::server::AppState;
use crate::security::Identity;
use crate::users::{Role, UserView};

#[derive(Debug, Serialize, Deserialize)]
pub struct Me {
    pub user: UserView,
    pub session_id: String,
}

/// The caller's account.
pub async fn me(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Me>, ApiError> {
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        // the account was removed after the session was issued
        .ok_or(PipelineError::InvalidSession)?;

    Ok(Json(Me {
        user: UserView::from(&user),
        session_id: identity.session_id,
    }))
}

/// Every account. Admins only.
pub async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<UserView>>, ApiError> {
    identity.require_role(&[Role::Admin])?;
    let users = state.users.list().await?;
    Ok(Json(users.iter().map(UserView::from).collect()))
}
