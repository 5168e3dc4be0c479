//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness check
//! GET    /health/ready                    - Readiness check (database)
//!
//! # Accounts
//! POST   /users                           - Register (201)
//! POST   /auth                            - Login, starts a session
//! POST   /auth/logout                     - Logout
//! GET    /users/{id}                      - Public profile
//! PATCH  /update/{id}                     - Update profile
//! POST   /contact/{id}                    - Message the shop
//!
//! # Catalog
//! GET    /home                            - All products
//!
//! # Basket
//! GET    /cart/{id}                       - Aggregated basket
//! PATCH  /cart/{id}/product/{product_id}  - Add one unit
//! PATCH  /cart/{id}/more/{product_id}     - Add one more unit
//! DELETE /cart/product/{product_id}       - Remove one unit
//!
//! # Orders
//! POST   /cart/{id}                       - Open an order (201)
//! PATCH  /setorder/{id}                   - Finalize the pending order
//! DELETE /setorder/{id}                   - Discard unfinished orders
//! GET    /vieworders/{id}                 - Order history
//! ```
//!
//! Every `{id}` route requires a session whose user is `{id}`: no session is
//! `401`, someone else's id is `403`. Successful responses are
//! `{"data": ...}`; failures are `{"error": "..."}`.

pub mod auth;
pub mod cart;
pub mod contact;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Json, Router,
    extract::FromRequest,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// JSON body extractor whose rejections render as `{"error": ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Success envelope: serializes as `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub const fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Sign-up and login, behind the auth rate limiter.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(users::register))
        .route("/auth", post(auth::login))
        .layer(auth_rate_limiter())
}

/// Create the basket routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(cart::show).post(cart::create_order))
        .route("/{id}/product/{product_id}", patch(cart::add))
        .route("/{id}/more/{product_id}", patch(cart::add_more))
        .route("/product/{product_id}", delete(cart::remove_one))
}

/// Create all API routes (no session or observability layers).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(auth_routes())
        .route("/auth/logout", post(auth::logout))
        .route("/users/{id}", get(users::retrieve))
        .route("/update/{id}", patch(users::update))
        .route("/contact/{id}", post(contact::send))
        .route("/home", get(products::list))
        .nest("/cart", cart_routes())
        .route(
            "/setorder/{id}",
            patch(orders::finalize).delete(orders::discard_unfinished),
        )
        .route("/vieworders/{id}", get(orders::list))
}
