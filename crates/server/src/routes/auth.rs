//! Session routes: login and logout.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use planbe_core::UserId;

use super::{ApiJson, Data};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Login result: the id the client uses in `{id}` routes.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: UserId,
}

/// Check credentials and start a session.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<Data<LoginResponse>> {
    let user = AuthService::new(state.pool(), state.email())
        .authenticate(&form.username, &form.password)
        .await?;

    let current = CurrentUser {
        id: user.id.clone(),
        username: user.username.clone(),
    };
    set_current_user(&session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    set_sentry_user(&user.id, Some(&user.username));
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Data::new(LoginResponse { id: user.id }))
}

/// End the session.
pub async fn logout(session: Session) -> Result<Data<()>> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    clear_sentry_user();
    Ok(Data::new(()))
}
