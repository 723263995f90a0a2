//! Checkout validation and planning.
//!
//! [`plan`] turns a locked cart snapshot into everything the orchestrator has
//! to write: frozen line prices, the subtotal, and the stock change for every
//! tracked product. It performs no I/O, so a failed plan means nothing was
//! written.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CommerceError;
use crate::inventory::{StockChange, StockLevel, apply_delta};
use crate::policy::{ProductAccess, is_purchasable};
use crate::types::{Identity, ProductId};

/// Where a checkout attempt is, for logging aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Collecting,
    Validating,
    Committing,
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Collecting => "collecting",
            Self::Validating => "validating",
            Self::Committing => "committing",
        })
    }
}

/// One cart line joined with its product row, read under lock.
///
/// `access` and `stock` must come from the same product row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    /// The product's current final price.
    pub unit_price: Decimal,
    pub access: ProductAccess,
    pub stock: StockLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    /// `None` for untracked products.
    pub stock_change: Option<StockChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutPlan {
    pub lines: Vec<PlannedLine>,
    pub subtotal: Decimal,
    pub total_items: i64,
}

/// Validate `lines` for `identity` and compute the order to write.
///
/// Availability is checked for every line before any stock check, so a cart
/// holding both an invisible product and an oversold one reports the
/// invisible product.
///
/// # Errors
///
/// `EmptyCart`, `ProductUnavailable` for the first line the caller may no
/// longer buy, or `InsufficientStock` for the first line that exceeds tracked
/// stock.
pub fn plan(identity: &Identity, lines: &[CheckoutLine]) -> Result<CheckoutPlan, CommerceError> {
    if lines.is_empty() {
        return Err(CommerceError::EmptyCart);
    }

    if let Some(line) = lines
        .iter()
        .find(|line| !is_purchasable(identity, &line.access))
    {
        return Err(CommerceError::ProductUnavailable {
            product_id: line.product_id,
        });
    }

    for line in lines {
        if line.quantity < 1 {
            return Err(CommerceError::validation("quantity must be at least 1"));
        }
        if !line.stock.can_supply(line.quantity) {
            return Err(CommerceError::InsufficientStock {
                product_id: line.product_id,
                available: line.stock.quantity.max(0),
            });
        }
    }

    let mut planned = Vec::with_capacity(lines.len());
    let mut subtotal = Decimal::ZERO;
    let mut total_items = 0_i64;

    for line in lines {
        let line_total = line.unit_price * Decimal::from(line.quantity);
        let stock_change = if line.stock.track_inventory {
            Some(apply_delta(line.product_id, &line.stock, -line.quantity)?)
        } else {
            None
        };

        subtotal += line_total;
        total_items += i64::from(line.quantity);
        planned.push(PlannedLine {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total,
            stock_change,
        });
    }

    Ok(CheckoutPlan {
        lines: planned,
        subtotal,
        total_items,
    })
}

/// Shipping and billing addresses after defaulting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addresses {
    pub shipping: String,
    pub billing: String,
}

impl Addresses {
    /// Billing falls back to shipping when omitted or blank.
    ///
    /// # Errors
    ///
    /// `Validation` if the shipping address is blank.
    pub fn resolve(shipping: &str, billing: Option<&str>) -> Result<Self, CommerceError> {
        let shipping = shipping.trim();
        if shipping.is_empty() {
            return Err(CommerceError::validation("shipping_address is required"));
        }

        let billing = billing
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(shipping);

        Ok(Self {
            shipping: shipping.to_owned(),
            billing: billing.to_owned(),
        })
    }
}
