//! Catalog operations scoped by the visibility policy.
//!
//! Invisible products are reported as `NotFound` everywhere so callers cannot
//! probe for their existence. Stock adjustments and full updates run inside a
//! unit of work holding the product row lock.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument, warn};

use bika_core::inventory::{StockLevel, apply_delta};
use bika_core::naming::{sku_candidates, slug_candidates, slugify};
use bika_core::policy::{VisibilityScope, can_adjust_stock, can_browse, can_mutate, can_view};
use bika_core::{
    CategoryId, CommerceError, Identity, ProductId, ProductStatus, UserId, Visibility,
};

use super::{Result, ServiceError};
use crate::db::{RepositoryError, Store};
use crate::models::{Category, Product, ProductFields, ProductQuery};

const DEFAULT_CATEGORY: &str = "General";
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;
const CANDIDATE_LIMIT: usize = 10_000;
const INSERT_ATTEMPTS: usize = 3;
/// Prices are stored as `NUMERIC(12, 2)`.
const PRICE_LIMIT: Decimal = Decimal::from_parts(0x540B_E400, 2, 0, false, 0); // 10_000_000_000

/// Listing filters as sent by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<ProductStatus>,
    pub category_id: Option<CategoryId>,
    pub vendor_id: Option<UserId>,
    /// Only the caller's own products, in any status.
    pub mine: bool,
    /// Management view: admins see every status.
    pub manage: bool,
}

/// A category given by id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(CategoryId),
    Name(String),
}

impl CategoryRef {
    /// Numeric strings are ids.
    fn normalize(&self) -> Self {
        match self {
            Self::Name(name) => name
                .trim()
                .parse::<CategoryId>()
                .map_or_else(|_| Self::Name(name.trim().to_owned()), Self::Id),
            Self::Id(id) => Self::Id(*id),
        }
    }
}

/// Create or update payload. Absent fields keep their current value on
/// update and take defaults on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    /// `Some(None)` is an explicit `null`, which clears the value on update.
    #[serde(default, deserialize_with = "explicit_null")]
    pub compare_price: Option<Option<Decimal>>,
    pub stock_quantity: Option<i32>,
    pub status: Option<ProductStatus>,
    /// Alias for `status`: `true` is active, `false` is draft.
    pub active: Option<bool>,
    pub track_inventory: Option<bool>,
    pub low_stock_threshold: Option<i32>,
    pub visibility: Option<Visibility>,
    pub category: Option<CategoryRef>,
    pub vendor: Option<UserId>,
}

impl ProductInput {
    fn requested_status(&self) -> Option<ProductStatus> {
        self.status.or_else(|| {
            self.active.map(|active| {
                if active {
                    ProductStatus::Active
                } else {
                    ProductStatus::Draft
                }
            })
        })
    }
}

/// Result of a stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub name: String,
    pub delta: i32,
    pub stock_quantity: i32,
    pub status: ProductStatus,
    pub is_in_stock: bool,
}

/// Catalog reads and writes for one caller at a time.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Products visible to `identity`, newest first.
    ///
    /// Outside `mine` and the admin management view only active products are
    /// listed; asking for another status there yields nothing.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn list(&self, identity: &Identity, filter: ListFilter) -> Result<Vec<Product>> {
        let mut query = ProductQuery::visible_to(VisibilityScope::for_identity(Some(identity)));
        query.category_id = filter.category_id;
        query.vendor_id = filter.vendor_id;

        if filter.mine {
            query.created_by = Some(identity.id);
            query.status = filter.status;
        } else if filter.manage && identity.is_global_admin() {
            query.status = filter.status;
        } else {
            match filter.status {
                None | Some(ProductStatus::Active) => query.status = Some(ProductStatus::Active),
                Some(_) => return Ok(Vec::new()),
            }
        }

        Ok(self.store.list_products(&query).await?)
    }

    /// A single product the caller may browse.
    ///
    /// # Errors
    ///
    /// `NotFound` if the product is missing, invisible, or a non-active
    /// product of someone else.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn detail(&self, identity: &Identity, id: ProductId) -> Result<Product> {
        let product = self
            .store
            .get_product(id)
            .await?
            .filter(|p| can_browse(identity, &p.access()))
            .ok_or(CommerceError::NotFound)?;
        Ok(product)
    }

    /// Create a product owned by `identity`.
    ///
    /// # Errors
    ///
    /// `Validation` for a missing name, negative amounts, an unknown category
    /// or vendor, or an explicit slug/SKU already in use.
    #[instrument(skip(self, identity, input), fields(user_id = %identity.id))]
    pub async fn create(&self, identity: &Identity, input: ProductInput) -> Result<Product> {
        let status = input.requested_status().unwrap_or(ProductStatus::Active);
        let mut fields = ProductFields {
            name: input.name.as_deref().unwrap_or_default().trim().to_owned(),
            slug: String::new(),
            sku: String::new(),
            description: input.description.clone().unwrap_or_default(),
            category_id: CategoryId::new(0),
            created_by: Some(identity.id),
            vendor_id: None,
            visibility: input.visibility.unwrap_or_default(),
            status,
            price: input.price.unwrap_or(Decimal::ZERO),
            compare_price: input.compare_price.flatten(),
            stock_quantity: input.stock_quantity.unwrap_or(0),
            track_inventory: input.track_inventory.unwrap_or(true),
            low_stock_threshold: input
                .low_stock_threshold
                .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
            published_at: (status == ProductStatus::Active).then(Utc::now),
        };
        validate(&fields)?;

        fields.category_id = self.resolve_category(input.category.as_ref()).await?;
        fields.vendor_id = Some(match input.vendor {
            Some(vendor) => self.existing_account(vendor).await?,
            None => self.default_vendor(identity).await?,
        });

        for attempt in 1..=INSERT_ATTEMPTS {
            fields.slug = self
                .product_slug(input.slug.as_deref(), &fields.name, None)
                .await?;
            fields.sku = self.product_sku(input.sku.as_deref(), None).await?;

            match self.store.insert_product(&fields).await {
                Ok(id) => {
                    info!(product_id = %id, slug = %fields.slug, sku = %fields.sku, "Created product");
                    return self.reload(id).await;
                }
                Err(RepositoryError::Conflict(constraint)) if attempt < INSERT_ATTEMPTS => {
                    warn!(%constraint, attempt, "Generated identifier taken concurrently, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ServiceError::Internal(
            "product identifiers kept colliding".to_owned(),
        ))
    }

    /// Apply `input` to a product the caller may mutate.
    ///
    /// Slug, SKU, vendor and category are kept unless sent. `published_at` is
    /// set the first time the product becomes active. A new `stock_quantity`
    /// goes through the stock adjustment primitive, so the status follows the
    /// stock unless `status` is sent in the same request.
    ///
    /// # Errors
    ///
    /// `NotFound` if invisible, `PermissionDenied` unless creator or admin,
    /// `Validation` for bad values.
    #[instrument(skip(self, identity, input), fields(user_id = %identity.id))]
    pub async fn update(
        &self,
        identity: &Identity,
        id: ProductId,
        input: ProductInput,
    ) -> Result<Product> {
        let current = self.mutable_product(identity, id).await?;

        // Store lookups first; the unit of work below holds the row lock.
        let category_id = match input.category.as_ref() {
            Some(category) => Some(self.resolve_category(Some(category)).await?),
            None => None,
        };
        let vendor_id = match input.vendor {
            Some(vendor) => Some(self.existing_account(vendor).await?),
            None => None,
        };
        let name = input.name.as_deref().map(str::trim).unwrap_or(&current.name);
        let slug = match input.slug.as_deref() {
            Some(slug) => Some(self.product_slug(Some(slug), name, Some(id)).await?),
            None => None,
        };
        let sku = match input.sku.as_deref() {
            Some(sku) => Some(self.product_sku(Some(sku), Some(id)).await?),
            None => None,
        };

        let mut uow = self.store.begin().await?;
        let locked = uow.lock_product(id).await?.ok_or(CommerceError::NotFound)?;
        if !can_mutate(identity, &locked.access()) {
            return Err(CommerceError::PermissionDenied.into());
        }

        let mut fields = locked.fields();
        name.clone_into(&mut fields.name);
        if let Some(slug) = slug {
            fields.slug = slug;
        }
        if let Some(sku) = sku {
            fields.sku = sku;
        }
        if let Some(description) = input.description.as_ref() {
            fields.description.clone_from(description);
        }
        if let Some(category_id) = category_id {
            fields.category_id = category_id;
        }
        if vendor_id.is_some() {
            fields.vendor_id = vendor_id;
        }
        fields.visibility = input.visibility.unwrap_or(fields.visibility);
        fields.price = input.price.unwrap_or(fields.price);
        if let Some(compare_price) = input.compare_price {
            fields.compare_price = compare_price;
        }
        fields.track_inventory = input.track_inventory.unwrap_or(fields.track_inventory);
        fields.low_stock_threshold = input
            .low_stock_threshold
            .unwrap_or(fields.low_stock_threshold);

        if let Some(quantity) = input
            .stock_quantity
            .filter(|&quantity| quantity != locked.stock_quantity)
        {
            if fields.track_inventory && quantity < 0 {
                return Err(CommerceError::validation(
                    "stock_quantity must not be negative for tracked products",
                )
                .into());
            }
            let delta = quantity
                .checked_sub(locked.stock_quantity)
                .ok_or_else(|| CommerceError::validation("stock quantity out of range"))?;
            let level = StockLevel {
                track_inventory: fields.track_inventory,
                ..locked.stock()
            };
            let change = apply_delta(id, &level, delta)?;
            fields.stock_quantity = change.quantity;
            fields.status = change.status;
        }
        if let Some(status) = input.requested_status() {
            fields.status = status;
        }
        if fields.status == ProductStatus::Active && fields.published_at.is_none() {
            fields.published_at = Some(Utc::now());
        }
        validate(&fields)?;

        uow.update_product(id, &fields).await?;
        uow.commit().await?;

        info!(product_id = %id, status = %fields.status, "Updated product");
        self.reload(id).await
    }

    /// Delete a product the caller may mutate. Order items keep their snapshot.
    ///
    /// # Errors
    ///
    /// `NotFound` if invisible, `PermissionDenied` unless creator or admin.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn delete(&self, identity: &Identity, id: ProductId) -> Result<()> {
        self.mutable_product(identity, id).await?;
        if !self.store.delete_product(id).await? {
            return Err(CommerceError::NotFound.into());
        }
        info!(product_id = %id, "Deleted product");
        Ok(())
    }

    /// Add `delta` to a product's stock under an exclusive row lock.
    ///
    /// Works in every status so out-of-stock products can be restocked.
    ///
    /// # Errors
    ///
    /// `NotFound` if invisible, `PermissionDenied` unless creator, admin or
    /// the owning vendor, `Validation` for a zero delta, `InsufficientStock`
    /// if tracked stock would go negative.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn adjust_stock(
        &self,
        identity: &Identity,
        id: ProductId,
        delta: i32,
    ) -> Result<StockAdjustment> {
        let mut uow = self.store.begin().await?;
        let product = uow
            .lock_product(id)
            .await?
            .filter(|p| can_view(Some(identity), &p.access()))
            .ok_or(CommerceError::NotFound)?;
        if !can_adjust_stock(identity, &product.access()) {
            return Err(CommerceError::PermissionDenied.into());
        }

        let change = apply_delta(id, &product.stock(), delta)?;
        uow.write_stock(id, change).await?;
        uow.commit().await?;

        info!(
            product_id = %id,
            delta,
            stock_quantity = change.quantity,
            status = %change.status,
            "Adjusted stock"
        );

        Ok(StockAdjustment {
            product_id: id,
            name: product.name,
            delta,
            stock_quantity: change.quantity,
            status: change.status,
            is_in_stock: !product.track_inventory || change.quantity > 0,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn reload(&self, id: ProductId) -> Result<Product> {
        Ok(self
            .store
            .get_product(id)
            .await?
            .ok_or(RepositoryError::NotFound)?)
    }

    /// Visible and mutable by `identity`, else `NotFound`/`PermissionDenied`.
    async fn mutable_product(&self, identity: &Identity, id: ProductId) -> Result<Product> {
        let product = self
            .store
            .get_product(id)
            .await?
            .filter(|p| can_view(Some(identity), &p.access()))
            .ok_or(CommerceError::NotFound)?;
        if !can_mutate(identity, &product.access()) {
            return Err(CommerceError::PermissionDenied.into());
        }
        Ok(product)
    }

    async fn resolve_category(&self, category: Option<&CategoryRef>) -> Result<CategoryId> {
        match category.map(CategoryRef::normalize) {
            Some(CategoryRef::Id(id)) => match self.store.category(id).await? {
                Some(category) => Ok(category.id),
                None => Err(CommerceError::validation(format!("category {id} does not exist")).into()),
            },
            Some(CategoryRef::Name(name)) if !name.is_empty() => {
                Ok(self.ensure_category(&name).await?.id)
            }
            _ => match self.store.first_category().await? {
                Some(category) => Ok(category.id),
                None => Ok(self.ensure_category(DEFAULT_CATEGORY).await?.id),
            },
        }
    }

    /// The category called `name` (case-insensitive), created with a free
    /// slug if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn ensure_category(&self, name: &str) -> Result<Category> {
        if let Some(existing) = self.store.category_by_name(name).await? {
            return Ok(existing);
        }

        for slug in slug_candidates(&slugify(name), "category").take(CANDIDATE_LIMIT) {
            if self.store.category_slug_taken(&slug).await? {
                continue;
            }
            match self.store.insert_category(name, &slug).await {
                Ok(category) => {
                    info!(category_id = %category.id, slug = %category.slug, "Created category");
                    return Ok(category);
                }
                Err(RepositoryError::Conflict(_)) => {
                    if let Some(existing) = self.store.category_by_name(name).await? {
                        return Ok(existing);
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ServiceError::Internal(format!(
            "no free slug for category {name}"
        )))
    }

    async fn existing_account(&self, user_id: UserId) -> Result<UserId> {
        match self.store.find_account(user_id).await? {
            Some(account) => Ok(account.identity.id),
            None => Err(CommerceError::validation(format!("vendor {user_id} does not exist")).into()),
        }
    }

    /// The creator if they are a vendor, else the first active vendor, else the creator.
    async fn default_vendor(&self, identity: &Identity) -> Result<UserId> {
        if identity.is_vendor() {
            return Ok(identity.id);
        }
        Ok(self
            .store
            .first_active_vendor()
            .await?
            .unwrap_or(identity.id))
    }

    async fn product_slug(
        &self,
        requested: Option<&str>,
        name: &str,
        exclude: Option<ProductId>,
    ) -> Result<String> {
        if let Some(slug) = requested.map(slugify).filter(|s| !s.is_empty()) {
            if self.store.slug_taken(&slug, exclude).await? {
                return Err(CommerceError::validation(format!("slug {slug} is already in use")).into());
            }
            return Ok(slug);
        }

        for candidate in slug_candidates(&slugify(name), "product").take(CANDIDATE_LIMIT) {
            if !self.store.slug_taken(&candidate, exclude).await? {
                return Ok(candidate);
            }
        }
        Err(ServiceError::Internal(format!("no free slug for {name}")))
    }

    async fn product_sku(&self, requested: Option<&str>, exclude: Option<ProductId>) -> Result<String> {
        if let Some(sku) = requested.map(str::trim).filter(|s| !s.is_empty()) {
            if self.store.sku_taken(sku, exclude).await? {
                return Err(CommerceError::validation(format!("sku {sku} is already in use")).into());
            }
            return Ok(sku.to_owned());
        }

        for candidate in sku_candidates().take(CANDIDATE_LIMIT) {
            if !self.store.sku_taken(&candidate, exclude).await? {
                return Ok(candidate);
            }
        }
        Err(ServiceError::Internal("no free SKU".to_owned()))
    }
}

/// Present-but-null becomes `Some(None)`; an absent field stays `None` via
/// `#[serde(default)]`.
fn explicit_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate(fields: &ProductFields) -> std::result::Result<(), CommerceError> {
    if fields.name.is_empty() {
        return Err(CommerceError::validation("name is required"));
    }
    if fields.price < Decimal::ZERO {
        return Err(CommerceError::validation("price must not be negative"));
    }
    if fields.price >= PRICE_LIMIT {
        return Err(CommerceError::validation("price is too large"));
    }
    if fields.compare_price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(CommerceError::validation("compare_price must not be negative"));
    }
    if fields.compare_price.is_some_and(|p| p >= PRICE_LIMIT) {
        return Err(CommerceError::validation("compare_price is too large"));
    }
    if fields.track_inventory && fields.stock_quantity < 0 {
        return Err(CommerceError::validation(
            "stock_quantity must not be negative for tracked products",
        ));
    }
    if fields.low_stock_threshold < 0 {
        return Err(CommerceError::validation(
            "low_stock_threshold must not be negative",
        ));
    }
    Ok(())
}
