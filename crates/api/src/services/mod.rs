//! Business logic services for the API.
//!
//! # Services
//!
//! - `catalog` - Product listing, detail, create/update/delete and stock adjustment
//! - `cart` - Per-user cart lines
//! - `checkout` - Preview and the transactional cart-to-order conversion
//! - `dashboard` - Summary counts for the caller
//! - `orders` - Order history
//! - `payment` - The payment capability checkout charges through
//!
//! Every service borrows a [`Store`](crate::db::Store) and takes the caller's
//! identity explicitly; none of them read ambient request state.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod dashboard;
pub mod orders;
pub mod payment;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

use bika_core::CommerceError;

use crate::db::RepositoryError;

pub use cart::{CartService, CartView, CartViewLine};
pub use catalog::{CatalogService, CategoryRef, ListFilter, ProductInput, StockAdjustment};
pub use checkout::{CheckoutReceipt, CheckoutRequest, CheckoutService, Preview, PreviewLine};
pub use dashboard::{DashboardService, DashboardSummary};
pub use orders::OrderService;
pub use payment::{ChargeOutcome, ChargeRequest, OfflineSettlement, PaymentError, PaymentGateway};

/// Errors returned by services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A business rule refused the operation.
    #[error(transparent)]
    Rejected(#[from] CommerceError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Invariant broken inside the service, e.g. retries exhausted.
    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
