//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;

/// Read the database URL (`PLANBE_DATABASE_URL`, falling back to `DATABASE_URL`).
pub fn database_url() -> Result<SecretString, &'static str> {
    dotenvy::dotenv().ok();

    std::env::var("PLANBE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "PLANBE_DATABASE_URL not set")
}
