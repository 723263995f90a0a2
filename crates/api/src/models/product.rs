//! Product and category models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bika_core::inventory::StockLevel;
use bika_core::policy::{ProductAccess, VisibilityScope};
use bika_core::{CategoryId, ProductId, ProductStatus, UnitId, UserId, Visibility};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A product joined with its category name and the units of its creator and vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub description: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub created_by: Option<UserId>,
    pub vendor_id: Option<UserId>,
    pub creator_unit_id: Option<UnitId>,
    pub vendor_unit_id: Option<UnitId>,
    pub visibility: Visibility,
    pub status: ProductStatus,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub track_inventory: bool,
    pub low_stock_threshold: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Ownership facts for the policy engine.
    #[must_use]
    pub const fn access(&self) -> ProductAccess {
        ProductAccess {
            created_by: self.created_by,
            vendor_id: self.vendor_id,
            creator_unit_id: self.creator_unit_id,
            vendor_unit_id: self.vendor_unit_id,
            visibility: self.visibility,
            status: self.status,
        }
    }

    #[must_use]
    pub const fn stock(&self) -> StockLevel {
        StockLevel {
            quantity: self.stock_quantity,
            track_inventory: self.track_inventory,
            low_stock_threshold: self.low_stock_threshold,
            status: self.status,
        }
    }

    /// The price customers pay. `compare_price` is display-only.
    #[must_use]
    pub const fn final_price(&self) -> Decimal {
        self.price
    }

    /// Editable columns of this product.
    #[must_use]
    pub fn fields(&self) -> ProductFields {
        ProductFields {
            name: self.name.clone(),
            slug: self.slug.clone(),
            sku: self.sku.clone(),
            description: self.description.clone(),
            category_id: self.category_id,
            created_by: self.created_by,
            vendor_id: self.vendor_id,
            visibility: self.visibility,
            status: self.status,
            price: self.price,
            compare_price: self.compare_price,
            stock_quantity: self.stock_quantity,
            track_inventory: self.track_inventory,
            low_stock_threshold: self.low_stock_threshold,
            published_at: self.published_at,
        }
    }
}

/// Column values for inserting or fully rewriting a product.
///
/// Updates ignore `created_by`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub description: String,
    pub category_id: CategoryId,
    pub created_by: Option<UserId>,
    pub vendor_id: Option<UserId>,
    pub visibility: Visibility,
    pub status: ProductStatus,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub track_inventory: bool,
    pub low_stock_threshold: i32,
    pub published_at: Option<DateTime<Utc>>,
}

/// Filters for listing products. Results are newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub scope: VisibilityScope,
    pub status: Option<ProductStatus>,
    pub category_id: Option<CategoryId>,
    pub vendor_id: Option<UserId>,
    pub created_by: Option<UserId>,
    pub limit: Option<i64>,
}

impl ProductQuery {
    /// Everything `scope` can see, in any status.
    #[must_use]
    pub const fn visible_to(scope: VisibilityScope) -> Self {
        Self {
            scope,
            status: None,
            category_id: None,
            vendor_id: None,
            created_by: None,
            limit: None,
        }
    }

    /// Whether `product` passes every filter except `limit`.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.scope.matches(&product.access())
            && self.status.is_none_or(|s| s == product.status)
            && self.category_id.is_none_or(|c| c == product.category_id)
            && self.vendor_id.is_none_or(|v| Some(v) == product.vendor_id)
            && self.created_by.is_none_or(|u| Some(u) == product.created_by)
    }
}

/// Product as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub description: String,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub final_price: Decimal,
    pub stock_quantity: i32,
    pub is_in_stock: bool,
    pub is_low_stock: bool,
    pub track_inventory: bool,
    pub low_stock_threshold: i32,
    pub status: ProductStatus,
    pub active: bool,
    pub visibility: Visibility,
    pub category: CategoryId,
    pub category_name: String,
    pub vendor: Option<UserId>,
    pub created_by: Option<UserId>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        let stock = product.stock();
        Self {
            id: product.id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            sku: product.sku.clone(),
            description: product.description.clone(),
            price: product.price,
            compare_price: product.compare_price,
            final_price: product.final_price(),
            stock_quantity: product.stock_quantity,
            is_in_stock: stock.is_in_stock(),
            is_low_stock: stock.is_low_stock(),
            track_inventory: product.track_inventory,
            low_stock_threshold: product.low_stock_threshold,
            status: product.status,
            active: product.status == ProductStatus::Active,
            visibility: product.visibility,
            category: product.category_id,
            category_name: product.category_name.clone(),
            vendor: product.vendor_id,
            created_by: product.created_by,
            published_at: product.published_at,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}
