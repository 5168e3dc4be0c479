//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The session id
//! is random and server-side, so the cookie carries no signed payload.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ServerConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "planbe_session";

/// Session expiry time in seconds (14 days).
const SESSION_EXPIRY_SECONDS: i64 = 14 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The `tower_sessions.session` table is created by the server migrations.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &ServerConfig,
) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());

    // A web client on another origin needs SameSite=None, which requires Secure
    let same_site = if config.client_origin.is_some() && config.is_https() {
        tower_sessions::cookie::SameSite::None
    } else {
        tower_sessions::cookie::SameSite::Lax
    };

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(same_site)
        .with_http_only(true)
        .with_path("/")
}
