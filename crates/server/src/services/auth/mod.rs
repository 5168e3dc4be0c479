//! Authentication service.
//!
//! Provides account registration, password login, profile retrieval and
//! profile updates. Passwords are stored as Argon2id hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use planbe_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{NewUser, User, UserUpdate};
use crate::services::email::{Notification, Notifier, deliver};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum length of free-text profile fields.
const MAX_FIELD_LENGTH: usize = 100;

fn default_kind() -> String {
    "customer".to_owned()
}

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Profile update form. `password` is the current password; a missing or
/// blank `new_password` keeps it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub username: String,
    #[serde(default, alias = "newPassword")]
    pub new_password: Option<String>,
    pub password: String,
}

/// Trimmed, validated profile fields shared by sign-up and update.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Profile {
    kind: String,
    name: String,
    surname: String,
    email: Email,
    username: String,
}

impl Profile {
    fn parse(
        kind: &str,
        name: &str,
        surname: &str,
        email: &str,
        username: &str,
    ) -> Result<Self, AuthError> {
        let username = text_field("username", username)?;
        if username.chars().any(char::is_whitespace) {
            return Err(AuthError::invalid("username", "must not contain spaces"));
        }

        Ok(Self {
            kind: text_field("type", kind)?,
            name: text_field("name", name)?,
            surname: text_field("surname", surname)?,
            email: Email::parse(email)?,
            username,
        })
    }
}

/// Authentication service.
///
/// Handles registration, login and profile management. Account emails are
/// sent through `N` after the write succeeds.
pub struct AuthService<'a, N> {
    users: UserRepository<'a>,
    notifier: &'a N,
}

impl<'a, N: Notifier> AuthService<'a, N> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, notifier: &'a N) -> Self {
        Self {
            users: UserRepository::new(pool),
            notifier,
        }
    }

    /// Register a new account and send the sign-up confirmation.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidField`/`InvalidEmail` for malformed input.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UsernameTaken`/`EmailTaken` for duplicates.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: Registration) -> Result<User, AuthError> {
        let profile = Profile::parse(
            &form.kind,
            &form.name,
            &form.surname,
            &form.email,
            &form.username,
        )?;
        validate_password(&form.password)?;

        if self.users.username_holder(&profile.username).await?.is_some() {
            return Err(AuthError::UsernameTaken(profile.username));
        }
        if self.users.email_holder(&profile.email).await?.is_some() {
            return Err(AuthError::EmailTaken(profile.email.into()));
        }

        let new = NewUser {
            password_hash: hash_password(&form.password)?,
            kind: profile.kind,
            name: profile.name,
            surname: profile.surname,
            email: profile.email,
            username: profile.username,
        };

        let user = self
            .users
            .create(&UserId::generate(), &new)
            .await
            .map_err(|e| conflict_to_auth(e, &new.username, &new.email))?;

        tracing::info!(user_id = %user.id, "User registered");

        deliver(
            self.notifier,
            Notification::Registration {
                to: user.email.clone(),
                name: user.name.clone(),
                username: user.username.clone(),
            },
        )
        .await;

        Ok(user)
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let (user, password_hash) = self
            .users
            .get_by_username(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user's public profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn retrieve(&self, id: &UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Replace a user's profile after checking the current password.
    ///
    /// Username and email only conflict when a *different* account holds
    /// them; keeping your own is fine.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    /// Returns `AuthError::InvalidCredentials` if `password` is wrong.
    /// Returns `AuthError::UsernameTaken`/`EmailTaken` for duplicates.
    #[instrument(skip(self, form), fields(user_id = %id))]
    pub async fn update(&self, id: &UserId, form: ProfileUpdate) -> Result<User, AuthError> {
        let (_, current_hash) = self
            .users
            .get_with_hash(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(&form.password, &current_hash)?;

        let profile = Profile::parse(
            &form.kind,
            &form.name,
            &form.surname,
            &form.email,
            &form.username,
        )?;

        let password_hash = match form.new_password.as_deref().map(str::trim) {
            Some(new_password) if !new_password.is_empty() => {
                validate_password(new_password)?;
                hash_password(new_password)?
            }
            _ => current_hash,
        };

        if let Some(holder) = self.users.username_holder(&profile.username).await?
            && &holder != id
        {
            return Err(AuthError::UsernameTaken(profile.username));
        }
        if let Some(holder) = self.users.email_holder(&profile.email).await?
            && &holder != id
        {
            return Err(AuthError::EmailTaken(profile.email.into()));
        }

        let update = UserUpdate {
            kind: profile.kind,
            name: profile.name,
            surname: profile.surname,
            email: profile.email,
            username: profile.username,
            password_hash,
        };

        let user = self
            .users
            .update(id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => AuthError::UserNotFound,
                other => conflict_to_auth(other, &update.username, &update.email),
            })?;

        tracing::info!("User updated");

        deliver(
            self.notifier,
            Notification::AccountUpdated {
                to: user.email.clone(),
                name: user.name.clone(),
                username: user.username.clone(),
            },
        )
        .await;

        Ok(user)
    }
}

/// Map a unique violation that slipped past the pre-checks.
fn conflict_to_auth(err: RepositoryError, username: &str, email: &Email) -> AuthError {
    match err {
        RepositoryError::Conflict(msg) if msg.starts_with("email") => {
            AuthError::EmailTaken(email.to_string())
        }
        RepositoryError::Conflict(_) => AuthError::UsernameTaken(username.to_owned()),
        other => AuthError::Repository(other),
    }
}

fn text_field(field: &'static str, value: &str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::invalid(field, "must not be blank"));
    }
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Err(AuthError::invalid(
            field,
            format!("must be at most {MAX_FIELD_LENGTH} characters"),
        ));
    }
    Ok(value.to_owned())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
