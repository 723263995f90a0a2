//! Summary counts for the landing page.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use bika_core::policy::{VisibilityScope, can_browse};
use bika_core::{Identity, ProductId, ProductStatus};

use super::Result;
use crate::db::Store;
use crate::models::{Product, ProductQuery};

const RECENT_PRODUCTS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProductCounts {
    pub total: usize,
    pub active: usize,
    pub out_of_stock: usize,
    pub low_stock: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub items_count: usize,
    pub total_quantity: i64,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentProduct {
    pub id: ProductId,
    pub name: String,
    pub stock_quantity: i32,
    pub status: ProductStatus,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<&Product> for RecentProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            stock_quantity: product.stock_quantity,
            status: product.status,
            price: product.final_price(),
            created_at: product.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub products: ProductCounts,
    pub cart: CartTotals,
    pub recent_products: Vec<RecentProduct>,
}

pub struct DashboardService<'a> {
    store: &'a dyn Store,
}

impl<'a> DashboardService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Counts over the products the caller can browse, plus their cart totals.
    ///
    /// Drafts and retired products of other users are left out so the
    /// numbers agree with what the listing shows.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn summary(&self, identity: &Identity) -> Result<DashboardSummary> {
        let scope = VisibilityScope::for_identity(Some(identity));
        let products: Vec<Product> = self
            .store
            .list_products(&ProductQuery::visible_to(scope))
            .await?
            .into_iter()
            .filter(|p| can_browse(identity, &p.access()))
            .collect();

        let count = |status: ProductStatus| products.iter().filter(|p| p.status == status).count();
        let counts = ProductCounts {
            total: products.len(),
            active: count(ProductStatus::Active),
            out_of_stock: count(ProductStatus::OutOfStock),
            low_stock: products.iter().filter(|p| p.stock().is_low_stock()).count(),
        };

        let entries = self.store.cart_entries(identity.id).await?;
        let cart = CartTotals {
            items_count: entries.len(),
            total_quantity: entries.iter().map(|e| i64::from(e.line.quantity)).sum(),
            total_value: entries
                .iter()
                .map(|e| e.product.final_price() * Decimal::from(e.line.quantity))
                .sum(),
        };

        Ok(DashboardSummary {
            products: counts,
            cart,
            recent_products: products
                .iter()
                .take(RECENT_PRODUCTS)
                .map(RecentProduct::from)
                .collect(),
        })
    }
}
