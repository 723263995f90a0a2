//! Request ID correlation.
//!
//! `tower_http::request_id` sets `x-request-id` (keeping one supplied by an
//! upstream proxy). The helpers here put that ID on the request span and the
//! Sentry scope.

use axum::{
    body::Body,
    extract::Request,
    http::{self, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::Span;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
}

/// Span for `TraceLayer` with method, path and request ID fields.
pub fn make_request_span(request: &http::Request<Body>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = request_id(request.headers()),
    )
}

/// Tag the Sentry scope with the request ID for error correlation.
pub async fn tag_request_id(request: Request, next: Next) -> Response {
    let id = request_id(request.headers()).to_owned();
    if !id.is_empty() {
        sentry::configure_scope(|scope| {
            scope.set_tag("request_id", &id);
        });
    }
    next.run(request).await
}
