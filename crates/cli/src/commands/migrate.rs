//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! planbe-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `PLANBE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/server/migrations/` and are embedded at build
//! time. They create the `planbe` schema and the `tower_sessions` session
//! table.

use planbe_server::db;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url =
        super::database_url().map_err(|_| MigrationError::MissingEnvVar("PLANBE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
