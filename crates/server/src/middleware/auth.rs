//! Authentication extractors.
//!
//! Routes that act on a user's basket, orders or profile take a [`RequireAuth`]
//! and check the path id with [`RequireAuth::ensure_owner`].

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use planbe_core::UserId;

use crate::error::AppError;
use crate::models::CurrentUser;
use crate::models::session::keys;

/// Extractor that requires a logged-in user.
///
/// Rejects with `401 {"error": ...}` when there is no session user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(auth: RequireAuth, Path(id): Path<UserId>) -> Result<Json<()>> {
///     auth.ensure_owner(&id)?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub CurrentUser);

impl RequireAuth {
    /// The logged-in user's id.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.0.id
    }

    /// Reject requests whose path id is not the session user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when `id` belongs to someone else.
    pub fn ensure_owner(&self, id: &UserId) -> Result<(), AppError> {
        if &self.0.id == id {
            Ok(())
        } else {
            tracing::warn!(
                session_user = %self.0.id,
                requested_user = %id,
                "Cross-user access rejected"
            );
            Err(AppError::Forbidden(
                "you can only access your own account".to_string(),
            ))
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))?;

        let user: CurrentUser = session
            .get(keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))?;

        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
///
/// Cycles the session id first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Helper to end the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;

    fn auth(id: &str) -> RequireAuth {
        RequireAuth(CurrentUser {
            id: UserId::new(id),
            username: "ana".to_string(),
        })
    }

    #[test]
    fn test_ensure_owner_accepts_own_id() {
        assert!(auth("u1").ensure_owner(&UserId::new("u1")).is_ok());
    }

    #[test]
    fn test_ensure_owner_rejects_other_id() {
        let err = auth("u1").ensure_owner(&UserId::new("u2")).err();
        let status = err.map(|e| e.into_response().status());
        assert_eq!(status, Some(StatusCode::FORBIDDEN));
    }
}
