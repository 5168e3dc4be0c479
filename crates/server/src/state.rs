//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::catalog::CatalogService;
use crate::services::email::EmailService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    catalog: CatalogService,
    email: EmailService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, SmtpError> {
        let email = EmailService::new(&config.email)?;
        let catalog = CatalogService::new(pool.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                email,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the cached product catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }
}
