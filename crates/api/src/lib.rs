//! Bika API - multi-tenant catalog, cart and checkout service.
//!
//! The binary in `main.rs` wires [`app`] to `PostgreSQL` and Sentry. The
//! library is exposed so integration tests can drive the same router over the
//! in-memory store.
//!
//! # Architecture
//!
//! - [`routes`] - Axum handlers, one module per area
//! - [`services`] - Operations scoped by the caller's identity
//! - [`db`] - The `Store` seam with `PostgreSQL` and in-memory backends
//! - [`middleware`] - Identity extractor and request ID correlation
//!
//! Access rules, stock arithmetic and checkout planning live in `bika-core`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub use config::ApiConfig;
pub use state::AppState;

/// Build the application router with health probes and `/api/v1`.
///
/// Sentry layers are left to the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/health/ready", get(routes::readiness))
        .nest("/api/v1", routes::routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(middleware::make_request_span))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(axum::middleware::from_fn(middleware::tag_request_id)),
        )
}
