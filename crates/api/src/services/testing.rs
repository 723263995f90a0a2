//! Fixtures shared by service tests.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use bika_core::naming::slugify;
use bika_core::{CategoryId, Identity, ProductStatus, Role, UnitId, UserType, Visibility};

use crate::db::{CatalogStore, MemoryStore};
use crate::models::{NewAccount, Product, ProductFields};

/// Two units, one account per role, and a default category.
pub struct World {
    pub store: MemoryStore,
    pub unit: UnitId,
    pub other_unit: UnitId,
    /// Global admin via the `admin` role, no unit.
    pub admin: Identity,
    /// Staff member of `unit`; owns most fixture products.
    pub creator: Identity,
    /// Customer in `unit`.
    pub member: Identity,
    /// Customer in `other_unit`.
    pub outsider: Identity,
    /// Vendor account in `other_unit`.
    pub vendor: Identity,
    pub category: CategoryId,
}

impl World {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let unit = store.add_unit("Kigali North").await;
        let other_unit = store.add_unit("Musanze").await;

        let admin = store
            .add_account(NewAccount::new("amani").role(Role::Admin))
            .await;
        let creator = store.add_account(NewAccount::new("beatrice").unit(unit)).await;
        let member = store.add_account(NewAccount::new("claude").unit(unit)).await;
        let outsider = store
            .add_account(NewAccount::new("diane").unit(other_unit))
            .await;
        let vendor = store
            .add_account(
                NewAccount::new("eric")
                    .user_type(UserType::Vendor)
                    .unit(other_unit),
            )
            .await;

        let category = store.insert_category("General", "general").await.unwrap().id;

        Self {
            store,
            unit,
            other_unit,
            admin,
            creator,
            member,
            outsider,
            vendor,
            category,
        }
    }

    /// An active, tracked, unit-visible product owned by `owner`.
    pub fn fields(&self, owner: &Identity, name: &str) -> ProductFields {
        let slug = slugify(name);
        ProductFields {
            name: name.to_owned(),
            sku: format!("SKU-{slug}"),
            slug,
            description: String::new(),
            category_id: self.category,
            created_by: Some(owner.id),
            vendor_id: None,
            visibility: Visibility::Unit,
            status: ProductStatus::Active,
            price: Decimal::new(1000, 2),
            compare_price: None,
            stock_quantity: 10,
            track_inventory: true,
            low_stock_threshold: 5,
            published_at: None,
        }
    }

    pub async fn product(&self, fields: ProductFields) -> Product {
        let id = self.store.insert_product(&fields).await.unwrap();
        self.store.get_product(id).await.unwrap().unwrap()
    }

    /// Shorthand for an active tracked product with the given price (in cents) and stock.
    pub async fn stocked(&self, owner: &Identity, name: &str, cents: i64, stock: i32) -> Product {
        let mut fields = self.fields(owner, name);
        fields.price = Decimal::new(cents, 2);
        fields.stock_quantity = stock;
        self.product(fields).await
    }
}
