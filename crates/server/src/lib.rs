//! Planbe API server library.
//!
//! This crate provides the JSON API as a library, allowing it to be tested
//! and reused. The `planbe-server` binary adds sessions, Sentry and the
//! listener on top of [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the API router with tracing, request ids and CORS.
///
/// Session and Sentry layers are added by the binary; without a session
/// layer every authenticated route answers `401`.
pub fn app(state: AppState) -> Router {
    let cors = middleware::cors_layer(state.config());

    routes::routes()
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .with_state(state)
}
