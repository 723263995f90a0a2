//! Payment capability used by checkout.
//!
//! Gateways are opaque: checkout hands over amount, currency and method and
//! gets back a status and an optional external reference. Wire protocols for
//! mobile money and card processors live behind implementations of
//! [`PaymentGateway`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use bika_core::{CurrencyCode, PaymentMethod, PaymentStatus};

/// What checkout asks the gateway to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub order_number: String,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub method: PaymentMethod,
    pub mobile_money_phone: Option<String>,
    pub payer_email: Option<String>,
}

/// The gateway's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeOutcome {
    pub status: PaymentStatus,
    pub external_reference: Option<String>,
}

impl ChargeOutcome {
    /// Outcomes that must abort checkout.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(
            self.status,
            PaymentStatus::Failed | PaymentStatus::Cancelled
        )
    }
}

/// Errors a gateway can raise.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),

    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can collect a payment.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempt to collect `request.amount`.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, PaymentError>;
}

/// Records payments without contacting a processor.
///
/// Bank transfers are treated as settled; every other method stays `pending`
/// until reconciled out of band.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSettlement;

#[async_trait]
impl PaymentGateway for OfflineSettlement {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, PaymentError> {
        let status = if request.method.settles_immediately() {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Pending
        };

        Ok(ChargeOutcome {
            status,
            external_reference: Some(format!("OFF-{}", Uuid::new_v4().simple())),
        })
    }
}
