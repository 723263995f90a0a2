//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (binary only)
//! 2. Request ID (`SetRequestIdLayer`, generates a UUID when absent)
//! 3. `TraceLayer` (span per request carrying the request ID)
//! 4. Request ID propagation to the response and the Sentry scope
//!
//! Identity is resolved per handler by the [`RequireIdentity`] extractor.

pub mod identity;
pub mod request_id;

pub use identity::RequireIdentity;
pub use request_id::{REQUEST_ID_HEADER, make_request_span, tag_request_id};
