//! User repository for database operations.
//!
//! Queries are checked at runtime (`query_as` with [`sqlx::FromRow`] rows),
//! so building the crate does not need a live database.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use planbe_core::{Email, UserId};

use super::RepositoryError;
use crate::models::user::{NewUser, User, UserUpdate};

const USER_COLUMNS: &str =
    "id, kind, name, surname, email, username, password_hash, created_at, updated_at";

#[derive(FromRow)]
struct UserRow {
    id: UserId,
    kind: String,
    name: String,
    surname: String,
    email: String,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<(User, String), RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let user = User {
            id: self.id,
            kind: self.kind,
            name: self.name,
            surname: self.surname,
            email,
            username: self.username,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Ok((user, self.password_hash))
    }
}

fn describe_conflict(constraint: Option<&str>) -> String {
    match constraint {
        Some("users_username_key") => "username already exists".to_owned(),
        Some("users_email_key") => "email already exists".to_owned(),
        _ => "user already exists".to_owned(),
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.get_with_hash(id).await?.map(|(user, _)| user))
    }

    /// Get a user and their password hash by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_hash(
        &self,
        id: &UserId,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM planbe.users WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Get a user and their password hash by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM planbe.users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Find the id of the user holding `username`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn username_holder(&self, username: &str) -> Result<Option<UserId>, RepositoryError> {
        let id = sqlx::query_scalar("SELECT id FROM planbe.users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.pool)
            .await?;
        Ok(id)
    }

    /// Find the id of the user holding `email`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_holder(&self, email: &Email) -> Result<Option<UserId>, RepositoryError> {
        let id = sqlx::query_scalar("SELECT id FROM planbe.users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;
        Ok(id)
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username or email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, id: &UserId, new: &NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO planbe.users (id, kind, name, surname, email, username, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&new.kind)
        .bind(&new.name)
        .bind(&new.surname)
        .bind(new.email.as_str())
        .bind(&new.username)
        .bind(&new.password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, describe_conflict))?;

        Ok(row.into_user()?.0)
    }

    /// Replace a user's profile fields and password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if the username or email is taken.
    pub async fn update(&self, id: &UserId, update: &UserUpdate) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            UPDATE planbe.users
            SET kind = $2, name = $3, surname = $4, email = $5, username = $6,
                password_hash = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.kind)
        .bind(&update.name)
        .bind(&update.surname)
        .bind(update.email.as_str())
        .bind(&update.username)
        .bind(&update.password_hash)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, describe_conflict))?;

        let row = row.ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))?;
        Ok(row.into_user()?.0)
    }
}

/// Lock a user's row for the rest of the transaction.
///
/// Serializes concurrent basket and checkout writes for the same user.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user does not exist.
pub async fn lock<'e, E>(executor: E, id: &UserId) -> Result<(), RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let locked: Option<UserId> =
        sqlx::query_scalar("SELECT id FROM planbe.users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;

    locked
        .map(|_| ())
        .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_conflict_names_the_field() {
        assert_eq!(
            describe_conflict(Some("users_username_key")),
            "username already exists"
        );
        assert_eq!(describe_conflict(Some("users_email_key")), "email already exists");
        assert_eq!(describe_conflict(None), "user already exists");
    }
}
