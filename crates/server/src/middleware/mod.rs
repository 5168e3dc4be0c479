//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (web client origin, with credentials)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting on sign-up and login (governor)

pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{RequireAuth, clear_current_user, set_current_user};
pub use cors::cors_layer;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
