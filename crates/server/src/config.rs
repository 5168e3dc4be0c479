//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PLANBE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `PLANBE_BASE_URL` - Public URL of the API
//! - `SMTP_HOST` - SMTP server hostname
//! - `SMTP_USERNAME` - SMTP authentication username
//! - `SMTP_PASSWORD` - SMTP authentication password
//! - `SMTP_FROM` - Email sender address
//!
//! ## Optional
//! - `PLANBE_HOST` - Bind address (default: 127.0.0.1)
//! - `PLANBE_PORT` - Listen port (default: 8080)
//! - `PLANBE_CLIENT_ORIGIN` - Origin of the web client allowed by CORS
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `EMAIL_SHOP_INBOX` - Inbox for contact messages (default: `SMTP_FROM`)
//! - `EMAIL_BCC` - Address copied on every customer email
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 2.5;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: Url,
    /// Web client origin allowed to make credentialed requests
    pub client_origin: Option<String>,
    /// Outgoing email configuration
    pub email: EmailConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the SMTP password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// Sender address (From header)
    pub from_address: String,
    /// Destination of contact-form messages
    pub shop_inbox: String,
    /// Blind copy on customer emails
    pub bcc: Option<String>,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("shop_inbox", &self.shop_inbox)
            .field("bcc", &self.bcc)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("PLANBE_DATABASE_URL")?;
        let host = get_env_or_default("PLANBE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("PLANBE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PLANBE_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PLANBE_PORT".to_string(), e.to_string()))?;
        let base_url = Url::parse(&get_required_env("PLANBE_BASE_URL")?).map_err(|e| {
            ConfigError::InvalidEnvVar("PLANBE_BASE_URL".to_string(), e.to_string())
        })?;
        let client_origin = get_optional_env("PLANBE_CLIENT_ORIGIN");

        let email = EmailConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_rate("SENTRY_SAMPLE_RATE", 1.0);
        let sentry_traces_sample_rate = parse_rate("SENTRY_TRACES_SAMPLE_RATE", 0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            client_origin,
            email,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies must be marked `Secure`.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;
        let from_address = get_required_env("SMTP_FROM")?;
        let shop_inbox =
            get_optional_env("EMAIL_SHOP_INBOX").unwrap_or_else(|| from_address.clone());

        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_validated_secret("SMTP_PASSWORD")?,
            from_address,
            shop_inbox,
            bcc: get_optional_env("EMAIL_BCC"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a sample rate, clamped to `0.0..=1.0`.
fn parse_rate(key: &str, default: f32) -> f32 {
    get_optional_env(key)
        .and_then(|s| s.parse::<f32>().ok())
        .map_or(default, |rate| rate.clamp(0.0, 1.0))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email_config() -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.sendgrid.net".to_string(),
            smtp_port: 587,
            smtp_username: "apikey".to_string(),
            smtp_password: SecretString::from("SG.very_secret_value"),
            from_address: "hola@eatplanbe.com".to_string(),
            shop_inbox: "hola@eatplanbe.com".to_string(),
            bcc: None,
        }
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-smtp-password", "SMTP_PASSWORD"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("changeme123", "SMTP_PASSWORD").is_err());
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaa", "SMTP_PASSWORD").is_err());
        assert!(validate_secret_strength("SG.q8Zr2LmX4vTn7pKw", "SMTP_PASSWORD").is_ok());
    }

    #[test]
    fn test_socket_addr_and_scheme() {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/planbe"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            base_url: Url::parse("https://api.eatplanbe.com").unwrap(),
            client_origin: None,
            email: email_config(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
        assert!(config.is_https());
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let debug_output = format!("{:?}", email_config());
        assert!(debug_output.contains("smtp.sendgrid.net"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("very_secret_value"));
    }
}
