//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; failures render as `{"error": "..."}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use planbe_core::CoreError;

use crate::db::RepositoryError;
use crate::services::ShopError;
use crate::services::auth::AuthError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or account operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Basket, checkout or contact operation failed.
    #[error("{0}")]
    Shop(#[from] ShopError),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but acting on someone else's resources.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::Shop(ShopError::Core(err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

const fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::Invalid { .. } => StatusCode::BAD_REQUEST,
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::UsernameTaken(_) | AuthError::EmailTaken(_) => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_)
                | AuthError::InvalidField { .. }
                | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(err) => repository_status(err),
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Shop(err) => match err {
                ShopError::Core(err) => core_status(err),
                ShopError::Repository(err) => repository_status(err),
                ShopError::Email(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self) -> String {
        if self.status().is_server_error() {
            return match self {
                Self::Shop(ShopError::Email(_)) => "Could not send message, try again later",
                _ => "Internal server error",
            }
            .to_string();
        }

        match self {
            Self::Auth(AuthError::InvalidCredentials) => "Invalid username or password".to_string(),
            Self::Auth(err) => err.to_string(),
            Self::Shop(err) => err.to_string(),
            Self::Database(err) => err.to_string(),
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        // Don't expose internal error details to clients
        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;
    use crate::services::email::EmailError;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    async fn body_json(err: AppError) -> serde_json::Value {
        let bytes = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_core_error_status_codes() {
        assert_eq!(
            get_status(CoreError::NotFound("no pending order".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CoreError::Conflict("2 pending orders".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CoreError::invalid("day", "must be a number")),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(get_status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AuthError::UsernameTaken("ana".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::WeakPassword("short".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AuthError::UserNotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("pending".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ShopError::Email(EmailError::InvalidAddress("x".to_string()))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_error_body_is_json() {
        let body = body_json(CoreError::NotFound("product p9".to_string()).into()).await;
        assert_eq!(body["error"], "not found: product p9");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let body = body_json(AppError::Internal("pool exhausted at 10.0.0.3".to_string())).await;
        assert_eq!(body["error"], "Internal server error");
    }
}
