//! The stock adjustment primitive.
//!
//! Pure arithmetic over a locked snapshot. Callers must hold an exclusive lock
//! on the product row from the read that produced the [`StockLevel`] until the
//! resulting [`StockChange`] is committed.

use serde::{Deserialize, Serialize};

use crate::error::CommerceError;
use crate::types::{ProductId, ProductStatus};

/// Stock state of a product as read under lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity: i32,
    pub track_inventory: bool,
    pub low_stock_threshold: i32,
    pub status: ProductStatus,
}

impl StockLevel {
    /// Untracked products are always in stock.
    #[must_use]
    pub const fn is_in_stock(&self) -> bool {
        !self.track_inventory || self.quantity > 0
    }

    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.track_inventory && self.quantity > 0 && self.quantity <= self.low_stock_threshold
    }

    /// Whether `requested` units can be taken. Untracked stock never runs out.
    #[must_use]
    pub const fn can_supply(&self, requested: i32) -> bool {
        !self.track_inventory || requested <= self.quantity
    }
}

/// The values to persist after an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub quantity: i32,
    pub status: ProductStatus,
}

/// Apply `delta` to `level`.
///
/// # Errors
///
/// - `Validation` if `delta` is zero or the result overflows.
/// - `InsufficientStock` if a tracked product would go below zero. Nothing
///   should be written in that case.
pub fn apply_delta(
    product_id: ProductId,
    level: &StockLevel,
    delta: i32,
) -> Result<StockChange, CommerceError> {
    if delta == 0 {
        return Err(CommerceError::validation("delta must not be zero"));
    }

    let candidate = level
        .quantity
        .checked_add(delta)
        .ok_or_else(|| CommerceError::validation("stock quantity out of range"))?;

    if level.track_inventory && candidate < 0 {
        return Err(CommerceError::InsufficientStock {
            product_id,
            available: level.quantity.max(0),
        });
    }

    let quantity = if level.track_inventory {
        candidate.max(0)
    } else {
        candidate
    };

    let status = if level.track_inventory && quantity == 0 {
        ProductStatus::OutOfStock
    } else if quantity > 0 && level.status == ProductStatus::OutOfStock {
        ProductStatus::Active
    } else {
        level.status
    };

    Ok(StockChange { quantity, status })
}
