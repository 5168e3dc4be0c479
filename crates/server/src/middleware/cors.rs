//! CORS for the web client.
//!
//! The client runs on its own origin and sends the session cookie, so the
//! origin must be named explicitly (credentials rule out `*`).

use std::time::Duration;

use axum::http::{HeaderValue, Method, header::CONTENT_TYPE};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::ServerConfig;

/// Build the CORS layer. Without a configured client origin, cross-origin
/// requests are not allowed.
///
/// The origin is matched against the request's `Origin` header, so other
/// origins get no `Access-Control-Allow-Origin` at all.
#[must_use]
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let Some(origin) = config.client_origin.as_deref() else {
        return CorsLayer::new();
    };

    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::list([origin]))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([CONTENT_TYPE])
            .max_age(Duration::from_secs(60 * 60)),
        Err(_) => {
            tracing::warn!(origin, "Ignoring invalid PLANBE_CLIENT_ORIGIN");
            CorsLayer::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, header},
        routing::get,
    };
    use secrecy::SecretString;
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::EmailConfig;

    fn config(client_origin: Option<&str>) -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from("postgres://localhost/planbe"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            base_url: Url::parse("https://api.eatplanbe.com").unwrap(),
            client_origin: client_origin.map(str::to_owned),
            email: EmailConfig {
                smtp_host: "smtp.example.com".to_owned(),
                smtp_port: 587,
                smtp_username: "planbe".to_owned(),
                smtp_password: SecretString::from("kT9#vQ2!mZ7@pL4$"),
                from_address: "hola@eatplanbe.com".to_owned(),
                shop_inbox: "pedidos@eatplanbe.com".to_owned(),
                bcc: None,
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    async fn allowed_origin(config: &ServerConfig, origin: &str) -> Option<HeaderValue> {
        let app = Router::new()
            .route("/home", get(|| async { "ok" }))
            .layer(cors_layer(config));
        let request = Request::builder()
            .uri("/home")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .cloned()
    }

    #[tokio::test]
    async fn test_client_origin_is_echoed() {
        let config = config(Some("https://eatplanbe.com"));
        let allowed = allowed_origin(&config, "https://eatplanbe.com").await;
        assert_eq!(allowed.unwrap(), "https://eatplanbe.com");
    }

    #[tokio::test]
    async fn test_other_origins_get_no_allow_header() {
        let config = config(Some("https://eatplanbe.com"));
        assert!(allowed_origin(&config, "https://evil.example").await.is_none());
    }

    #[tokio::test]
    async fn test_no_client_origin_allows_nothing() {
        let config = config(None);
        assert!(allowed_origin(&config, "https://eatplanbe.com").await.is_none());
    }
}
