//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Data store readiness check
//!
//! # Store API
//! ANY  /api/store/{*path}          - Routing adapter (JSON in/out)
//!
//! # Diagnostics
//! GET  /api/test-adapter           - Adapter smoke checks
//! GET  /test                       - Adapter smoke checks
//! GET  /api/test-supabase          - Raw data store probe
//!
//! # Storefront pages
//! GET  /                           - Region picker
//! GET  /{country_code}             - Storefront context for a country
//! GET  /{country_code}/{*rest}     - Storefront context for a country page
//! ```

pub mod diagnostics;
pub mod health;
pub mod pages;
pub mod store;

use std::time::Duration;

use axum::{
    Router,
    http::{Request, Response},
    middleware::{from_fn, from_fn_with_state},
    routing::{any, get},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{region_redirect_middleware, request_id_middleware};
use crate::state::AppState;

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/api/store/{*path}", any(store::handle))
        .route("/api/test-adapter", get(diagnostics::adapter))
        .route("/api/test-supabase", get(diagnostics::data_store))
        .route("/test", get(diagnostics::adapter))
        .route("/", get(pages::region_picker))
        .route("/{country_code}", get(pages::country_home))
        .route("/{country_code}/{*rest}", get(pages::country_page))
}

/// Build the full application with middleware applied.
///
/// Sentry layers are added by the binary so tests run without a client.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(from_fn_with_state(state.clone(), region_redirect_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .with_state(state)
}
