//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Domain refusals become JSON
//! bodies of the form `{"error": code, "detail": message}`; stock failures also
//! carry `product_id` and `available`. Server errors are captured to Sentry and
//! their details are never sent to the client.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use bika_core::CommerceError;

use crate::db::RepositoryError;
use crate::services::ServiceError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// A catalog, cart or checkout rule refused the request.
    #[error(transparent)]
    Commerce(#[from] CommerceError),

    /// No usable identity on the request.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request body could not be parsed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Rejected(err) => Self::Commerce(err),
            ServiceError::Repository(err) => Self::Database(err),
            ServiceError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Commerce(err) => match err {
                CommerceError::PermissionDenied => StatusCode::FORBIDDEN,
                CommerceError::NotFound => StatusCode::NOT_FOUND,
                CommerceError::Validation(_) | CommerceError::EmptyCart => StatusCode::BAD_REQUEST,
                CommerceError::InsufficientStock { .. }
                | CommerceError::ProductUnavailable { .. } => StatusCode::CONFLICT,
                CommerceError::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::Database(RepositoryError::NotFound) => {
                json!({ "error": "not_found", "detail": "not found" })
            }
            Self::Database(RepositoryError::Conflict(_)) => {
                json!({ "error": "conflict", "detail": "conflicting update, please retry" })
            }
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => {
                json!({ "error": "internal_error", "detail": "Internal server error" })
            }
            Self::Commerce(err) => {
                let mut body = json!({ "error": err.code(), "detail": err.to_string() });
                match err {
                    CommerceError::InsufficientStock {
                        product_id,
                        available,
                    } => {
                        body["product_id"] = json!(product_id);
                        body["available"] = json!(available);
                    }
                    CommerceError::ProductUnavailable { product_id } => {
                        body["product_id"] = json!(product_id);
                    }
                    _ => {}
                }
                body
            }
            Self::Unauthorized(msg) => json!({ "error": "unauthorized", "detail": msg }),
            Self::BadRequest(msg) => json!({ "error": "validation_error", "detail": msg }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the identity extractor so errors are associated with the caller.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order created", Some(&[("order_number", "ORD20260309AB12CD")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bika_core::ProductId;

    async fn body_of(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases = [
            (
                AppError::Commerce(CommerceError::PermissionDenied),
                StatusCode::FORBIDDEN,
            ),
            (
                AppError::Commerce(CommerceError::NotFound),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Commerce(CommerceError::EmptyCart),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Commerce(CommerceError::PaymentFailed("declined".into())),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                AppError::Unauthorized("missing".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::Database(RepositoryError::Conflict("product_slug_key".into())),
                StatusCode::CONFLICT,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_insufficient_stock_body() {
        let (status, body) = body_of(AppError::Commerce(CommerceError::InsufficientStock {
            product_id: ProductId::new(2),
            available: 3,
        }))
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "insufficient_stock");
        assert_eq!(body["product_id"], 2);
        assert_eq!(body["available"], 3);
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) =
            body_of(AppError::Internal("pool exhausted at 10.0.0.3".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }
}
