//! Database operations for products and categories.
//!
//! Every product read goes through [`PRODUCT_SELECT`], which joins the
//! category and the creator and vendor accounts so the visibility rules get a
//! flat row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use bika_core::policy::VisibilityScope;
use bika_core::{CategoryId, ProductId, ProductStatus, UnitId, UserId, Visibility};

use super::{RepositoryError, Result};
use crate::models::{Category, Product, ProductFields, ProductQuery};

pub(super) const PRODUCT_SELECT: &str = r"
SELECT p.id, p.name, p.slug, p.sku, p.description, p.category_id,
       c.name AS category_name, p.created_by, p.vendor_id,
       cu.unit_id AS creator_unit_id, vu.unit_id AS vendor_unit_id,
       p.visibility, p.status, p.price, p.compare_price, p.stock_quantity,
       p.track_inventory, p.low_stock_threshold, p.published_at,
       p.created_at, p.updated_at
FROM bika.product p
JOIN bika.category c ON c.id = p.category_id
LEFT JOIN bika.user_account cu ON cu.id = p.created_by
LEFT JOIN bika.user_account vu ON vu.id = p.vendor_id
";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    id: i64,
    name: String,
    slug: String,
    sku: String,
    description: String,
    category_id: i64,
    category_name: String,
    created_by: Option<i64>,
    vendor_id: Option<i64>,
    creator_unit_id: Option<i64>,
    vendor_unit_id: Option<i64>,
    visibility: Visibility,
    status: ProductStatus,
    price: Decimal,
    compare_price: Option<Decimal>,
    stock_quantity: i32,
    track_inventory: bool,
    low_stock_threshold: i32,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            slug: row.slug,
            sku: row.sku,
            description: row.description,
            category_id: CategoryId::new(row.category_id),
            category_name: row.category_name,
            created_by: row.created_by.map(UserId::new),
            vendor_id: row.vendor_id.map(UserId::new),
            creator_unit_id: row.creator_unit_id.map(UnitId::new),
            vendor_unit_id: row.vendor_unit_id.map(UnitId::new),
            visibility: row.visibility,
            status: row.status,
            price: row.price,
            compare_price: row.compare_price,
            stock_quantity: row.stock_quantity,
            track_inventory: row.track_inventory,
            low_stock_threshold: row.low_stock_threshold,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
        }
    }
}

// =============================================================================
// Shared queries (pool or transaction)
// =============================================================================

/// Append the visibility predicate for `scope`.
fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: VisibilityScope) {
    match scope {
        VisibilityScope::Nothing => {
            qb.push(" AND FALSE");
        }
        VisibilityScope::Everything => {}
        VisibilityScope::Scoped { user_id, unit_id } => {
            qb.push(" AND (p.created_by = ");
            qb.push_bind(user_id.as_i64());
            qb.push(" OR (p.visibility = 'vendor' AND p.vendor_id = ");
            qb.push_bind(user_id.as_i64());
            qb.push(")");
            if let Some(unit_id) = unit_id {
                qb.push(" OR (p.visibility = 'unit' AND (cu.unit_id = ");
                qb.push_bind(unit_id.as_i64());
                qb.push(" OR vu.unit_id = ");
                qb.push_bind(unit_id.as_i64());
                qb.push("))");
            }
            qb.push(")");
        }
    }
}

pub(super) async fn fetch_product<'e>(
    executor: impl PgExecutor<'e>,
    id: ProductId,
    for_update: bool,
) -> Result<Option<Product>> {
    let lock = if for_update { " FOR UPDATE OF p" } else { "" };
    let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1{lock}");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id.as_i64())
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Product::from))
}

/// Lock rows in ascending id order so concurrent checkouts cannot deadlock.
pub(super) async fn lock_products<'e>(
    executor: impl PgExecutor<'e>,
    ids: &[ProductId],
) -> Result<Vec<Product>> {
    let mut ids: Vec<i64> = ids.iter().map(ProductId::as_i64).collect();
    ids.sort_unstable();
    ids.dedup();

    let sql = format!("{PRODUCT_SELECT} WHERE p.id = ANY($1) ORDER BY p.id FOR UPDATE OF p");
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(ids)
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(Product::from).collect())
}

pub(super) async fn write_stock<'e>(
    executor: impl PgExecutor<'e>,
    id: ProductId,
    quantity: i32,
    status: ProductStatus,
) -> Result<()> {
    let result = sqlx::query(
        r"
        UPDATE bika.product
        SET stock_quantity = $2, status = $3, updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(id.as_i64())
    .bind(quantity)
    .bind(status)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Rewrite every editable column except `created_by`.
pub(super) async fn update_product<'e>(
    executor: impl PgExecutor<'e>,
    id: ProductId,
    fields: &ProductFields,
) -> Result<()> {
    let result = sqlx::query(
        r"
        UPDATE bika.product
        SET name = $2, slug = $3, sku = $4, description = $5, category_id = $6,
            vendor_id = $7, visibility = $8, status = $9, price = $10,
            compare_price = $11, stock_quantity = $12, track_inventory = $13,
            low_stock_threshold = $14, published_at = $15, updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(id.as_i64())
    .bind(&fields.name)
    .bind(&fields.slug)
    .bind(&fields.sku)
    .bind(&fields.description)
    .bind(fields.category_id.as_i64())
    .bind(fields.vendor_id.map(|id| id.as_i64()))
    .bind(fields.visibility)
    .bind(fields.status)
    .bind(fields.price)
    .bind(fields.compare_price)
    .bind(fields.stock_quantity)
    .bind(fields.track_inventory)
    .bind(fields.low_stock_threshold)
    .bind(fields.published_at)
    .execute(executor)
    .await
    .map_err(RepositoryError::from_write)?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product and category database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let mut qb = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        qb.push(" WHERE TRUE");
        push_scope(&mut qb, query.scope);

        if let Some(status) = query.status {
            qb.push(" AND p.status = ");
            qb.push_bind(status);
        }
        if let Some(category_id) = query.category_id {
            qb.push(" AND p.category_id = ");
            qb.push_bind(category_id.as_i64());
        }
        if let Some(vendor_id) = query.vendor_id {
            qb.push(" AND p.vendor_id = ");
            qb.push_bind(vendor_id.as_i64());
        }
        if let Some(created_by) = query.created_by {
            qb.push(" AND p.created_by = ");
            qb.push_bind(created_by.as_i64());
        }

        qb.push(" ORDER BY p.created_at DESC, p.id DESC");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>> {
        fetch_product(self.pool, id, false).await
    }

    /// Whether a product other than `exclude` uses `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_taken(&self, slug: &str, exclude: Option<ProductId>) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bika.product WHERE slug = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(slug)
        .bind(exclude.map(|id| id.as_i64()))
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Whether a product other than `exclude` uses `sku`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sku_taken(&self, sku: &str, exclude: Option<ProductId>) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bika.product WHERE sku = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(sku)
        .bind(exclude.map(|id| id.as_i64()))
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate slug or SKU.
    pub async fn insert(&self, fields: &ProductFields) -> Result<ProductId> {
        let id = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO bika.product (
                name, slug, sku, description, category_id, created_by, vendor_id,
                visibility, status, price, compare_price, stock_quantity,
                track_inventory, low_stock_threshold, published_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id
            ",
        )
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(&fields.sku)
        .bind(&fields.description)
        .bind(fields.category_id.as_i64())
        .bind(fields.created_by.map(|id| id.as_i64()))
        .bind(fields.vendor_id.map(|id| id.as_i64()))
        .bind(fields.visibility)
        .bind(fields.status)
        .bind(fields.price)
        .bind(fields.compare_price)
        .bind(fields.stock_quantity)
        .bind(fields.track_inventory)
        .bind(fields.low_stock_threshold)
        .bind(fields.published_at)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(ProductId::new(id))
    }

    /// Delete a product. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bika.product WHERE id = $1")
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug FROM bika.category WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    /// Find a category by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug FROM bika.category WHERE lower(name) = lower($1) ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    /// The category with the lowest ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn first_category(&self) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug FROM bika.category ORDER BY id LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    /// Whether a category uses `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_slug_taken(&self, slug: &str) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bika.category WHERE slug = $1)",
        )
        .bind(slug)
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate name or slug.
    pub async fn insert_category(&self, name: &str, slug: &str) -> Result<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO bika.category (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;
        Ok(Category::from(row))
    }
}
