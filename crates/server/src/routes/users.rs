//! Account routes: sign-up, profile and profile updates.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use planbe_core::UserId;

use super::{ApiJson, Data};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::auth::{AuthService, ProfileUpdate, Registration};
use crate::state::AppState;

/// Register a new account.
///
/// Does not log the user in; the client calls `POST /auth` next.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<Registration>,
) -> Result<(StatusCode, Data<User>)> {
    let user = AuthService::new(state.pool(), state.email())
        .register(form)
        .await?;

    add_breadcrumb("auth", "User registered", Some(&[("user_id", user.id.as_str())]));

    Ok((StatusCode::CREATED, Data::new(user)))
}

/// Get the logged-in user's profile.
pub async fn retrieve(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<UserId>,
) -> Result<Data<User>> {
    auth.ensure_owner(&id)?;

    let user = AuthService::new(state.pool(), state.email())
        .retrieve(&id)
        .await?;

    Ok(Data::new(user))
}

/// Update the logged-in user's profile. Requires the current password.
pub async fn update(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<UserId>,
    ApiJson(form): ApiJson<ProfileUpdate>,
) -> Result<Data<User>> {
    auth.ensure_owner(&id)?;

    let user = AuthService::new(state.pool(), state.email())
        .update(&id, form)
        .await?;

    Ok(Data::new(user))
}
