//! Database operations for the Planbe `PostgreSQL` database.
//!
//! ## Tables (schema `planbe`)
//!
//! - `products` - Read-only catalog
//! - `users` - Accounts with argon2 password hashes
//! - `basket_items` - One row per unit added to a user's basket
//! - `orders` - Orders with their delivery details
//!
//! Sessions live in `tower_sessions.session`, managed by the session store.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p planbe-cli -- migrate
//! ```
//!
//! Basket and order functions take any [`sqlx::PgExecutor`] so the checkout
//! service can run them inside one transaction.

pub mod baskets;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to [`RepositoryError::Conflict`].
    ///
    /// `describe` receives the violated constraint name, if any.
    pub(crate) fn from_unique(err: sqlx::Error, describe: impl FnOnce(Option<&str>) -> String) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(describe(db_err.constraint()));
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
