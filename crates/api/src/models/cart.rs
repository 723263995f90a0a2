//! Cart models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bika_core::{CartLineId, ProductId, UserId};

use super::Product;

/// One product in a user's cart. Unique per (user, product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line with the live product row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEntry {
    pub line: CartLine,
    pub product: Product,
}
