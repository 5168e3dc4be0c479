//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! PLANBE_NEW_USER_PASSWORD='...' planbe-cli user create -u ana -e ana@example.com -n Ana -s Ruiz
//! ```
//!
//! The password is read from the environment so it never shows up in shell
//! history or the process list. No sign-up email is sent.

use thiserror::Error;

use planbe_core::{Email, UserId};
use planbe_server::db::{self, RepositoryError, users::UserRepository};
use planbe_server::models::NewUser;
use planbe_server::services::auth::hash_password;

/// Minimum password length, matching sign-up.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository error (including duplicate username/email).
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] planbe_core::EmailError),

    /// Invalid field value.
    #[error("Invalid {0}: must not be blank")]
    Blank(&'static str),

    /// Password too short.
    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    /// Hashing failed.
    #[error("Password hashing failed")]
    PasswordHash,
}

/// Create an account directly in the database.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns an error for invalid input, a taken username/email, or a database failure.
pub async fn create(
    username: &str,
    email: &str,
    name: &str,
    surname: &str,
    kind: &str,
) -> Result<UserId, UserError> {
    let new = build_user(username, email, name, surname, kind)?;

    let database_url =
        super::database_url().map_err(|_| UserError::MissingEnvVar("PLANBE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Creating user: {} ({})", new.username, new.email);

    let id = UserId::generate();
    let user = UserRepository::new(&pool).create(&id, &new).await?;

    tracing::info!(
        "User created successfully! ID: {}, Username: {}, Email: {}",
        user.id,
        user.username,
        user.email
    );

    Ok(user.id)
}

fn build_user(
    username: &str,
    email: &str,
    name: &str,
    surname: &str,
    kind: &str,
) -> Result<NewUser, UserError> {
    let password = std::env::var("PLANBE_NEW_USER_PASSWORD")
        .map_err(|_| UserError::MissingEnvVar("PLANBE_NEW_USER_PASSWORD"))?;
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(UserError::WeakPassword);
    }

    Ok(NewUser {
        kind: non_blank("type", kind)?,
        name: non_blank("name", name)?,
        surname: non_blank("surname", surname)?,
        email: Email::parse(email)?,
        username: non_blank("username", username)?,
        password_hash: hash_password(&password).map_err(|_| UserError::PasswordHash)?,
    })
}

fn non_blank(field: &'static str, value: &str) -> Result<String, UserError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(UserError::Blank(field));
    }
    Ok(value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("name", "  Ana ").ok(), Some("Ana".to_owned()));
        assert!(matches!(non_blank("name", "   "), Err(UserError::Blank("name"))));
    }
}
