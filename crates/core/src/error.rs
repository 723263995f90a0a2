//! Domain failures shared by the policy engine, stock primitive and checkout.

use thiserror::Error;

use crate::types::ProductId;

/// Why a catalog, cart or checkout operation was refused.
///
/// Every variant is a caller-facing outcome. Storage failures live in the API crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommerceError {
    #[error("you do not have permission to perform this action")]
    PermissionDenied,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("insufficient stock for product {product_id}: {available} available")]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
    },

    #[error("cart is empty")]
    EmptyCart,

    #[error("product {product_id} is no longer available")]
    ProductUnavailable { product_id: ProductId },

    #[error("payment failed: {0}")]
    PaymentFailed(String),
}

impl CommerceError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable code for API clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::Validation(_) => "validation_error",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::EmptyCart => "empty_cart",
            Self::ProductUnavailable { .. } => "product_unavailable",
            Self::PaymentFailed(_) => "payment_failed",
        }
    }
}
