//! Per-user cart lines.
//!
//! Lines are priced live from the product row; nothing is frozen until
//! checkout. Lines whose product the caller can no longer buy stay in the
//! cart flagged `is_available = false`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};

use bika_core::policy::{can_browse, is_purchasable};
use bika_core::{CartLineId, CommerceError, Identity, ProductId};

use super::Result;
use crate::db::{RepositoryError, Store};
use crate::models::{CartEntry, CartLine, Product, ProductView};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartViewLine {
    pub id: CartLineId,
    pub product: ProductView,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    /// Whether checkout would accept this line's product right now.
    pub is_available: bool,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartViewLine {
    fn new(identity: &Identity, line: &CartLine, product: &Product) -> Self {
        let unit_price = product.final_price();
        Self {
            id: line.id,
            product: ProductView::from(product),
            quantity: line.quantity,
            unit_price,
            line_total: unit_price * Decimal::from(line.quantity),
            is_available: is_purchasable(identity, &product.access()),
            added_at: line.added_at,
            updated_at: line.updated_at,
        }
    }
}

/// The caller's cart, newest line first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub lines: Vec<CartViewLine>,
    pub total_items: i64,
    pub subtotal: Decimal,
}

impl CartView {
    fn new(identity: &Identity, entries: &[CartEntry]) -> Self {
        let lines: Vec<CartViewLine> = entries
            .iter()
            .map(|entry| CartViewLine::new(identity, &entry.line, &entry.product))
            .collect();
        Self {
            total_items: lines.iter().map(|l| i64::from(l.quantity)).sum(),
            subtotal: lines.iter().map(|l| l.line_total).sum(),
            lines,
        }
    }
}

pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn view(&self, identity: &Identity) -> Result<CartView> {
        let entries = self.store.cart_entries(identity.id).await?;
        Ok(CartView::new(identity, &entries))
    }

    /// Add `quantity` of a product. Re-adding grows the existing line.
    ///
    /// # Errors
    ///
    /// `Validation` if `quantity < 1` or the grown line would overflow,
    /// `NotFound` unless the caller may browse the product.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn add(
        &self,
        identity: &Identity,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartViewLine> {
        if quantity < 1 {
            return Err(CommerceError::validation("quantity must be at least 1").into());
        }

        let product = self
            .store
            .get_product(product_id)
            .await?
            .filter(|p| can_browse(identity, &p.access()))
            .ok_or(CommerceError::NotFound)?;

        let line = match self.store.add_to_cart(identity.id, product_id, quantity).await {
            Ok(line) => line,
            Err(RepositoryError::NotFound) => return Err(CommerceError::NotFound.into()),
            Err(RepositoryError::OutOfRange) => {
                return Err(CommerceError::validation("quantity out of range").into());
            }
            Err(err) => return Err(err.into()),
        };

        info!(product_id = %product_id, quantity = line.quantity, "Added to cart");
        Ok(CartViewLine::new(identity, &line, &product))
    }

    /// Set a line's quantity. Zero or less removes the line and returns `None`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the line is not the caller's.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn update(
        &self,
        identity: &Identity,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<Option<CartViewLine>> {
        if quantity <= 0 {
            self.remove(identity, line_id).await?;
            return Ok(None);
        }

        let line = self
            .store
            .set_cart_quantity(identity.id, line_id, quantity)
            .await?
            .ok_or(CommerceError::NotFound)?;
        let product = self
            .store
            .get_product(line.product_id)
            .await?
            .ok_or(CommerceError::NotFound)?;

        debug!(line_id = %line_id, quantity, "Updated cart line");
        Ok(Some(CartViewLine::new(identity, &line, &product)))
    }

    /// # Errors
    ///
    /// `NotFound` if the line is not the caller's.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn remove(&self, identity: &Identity, line_id: CartLineId) -> Result<()> {
        if !self.store.remove_cart_line(identity.id, line_id).await? {
            return Err(CommerceError::NotFound.into());
        }
        debug!(line_id = %line_id, "Removed cart line");
        Ok(())
    }
}
