//! Persistence for accounts, catalog, carts and orders.
//!
//! # Database schema: `bika`
//!
//! - `unit` - collaboration groups
//! - `user_account` - accounts behind the identity header
//! - `category`, `product` - the catalog
//! - `cart_line` - one row per (user, product)
//! - `customer_order`, `order_item`, `payment` - written once by checkout
//!
//! # Stores
//!
//! Services talk to the [`Store`] trait. [`PgStore`] is the production
//! implementation; [`MemoryStore`] backs tests and local demos with the same
//! locking and all-or-nothing commit semantics.
//!
//! # Migrations
//!
//! Migrations live in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bika-cli -- migrate
//! ```

pub mod carts;
pub mod identities;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod products;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bika_core::inventory::StockChange;
use bika_core::{CartLineId, CategoryId, OrderId, ProductId, UserId};

use crate::models::{
    Account, CartEntry, CartLine, Category, NewOrder, NewOrderItem, NewPayment, Order,
    OrderDetail, OrderItem, OrderSummary, Payment, Product, ProductFields, ProductQuery,
};

pub use carts::CartRepository;
pub use identities::IdentityRepository;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use postgres::PgStore;
pub use products::ProductRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A computed integer column would overflow.
    #[error("value out of range")]
    OutOfRange,
}

impl RepositoryError {
    /// Map unique violations to `Conflict`, dangling references to
    /// `NotFound` and numeric overflow to `OutOfRange`; keep everything else
    /// as `Database`.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) => {
                Self::OutOfRange
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.constraint().unwrap_or("unique").to_owned())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => Self::NotFound,
            _ => Self::Database(err),
        }
    }
}

/// SQLSTATE `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Accounts backing the identity header.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// An active account by id. Inactive accounts are reported as absent.
    async fn find_account(&self, id: UserId) -> Result<Option<Account>>;

    /// The lowest-id active vendor account.
    async fn first_active_vendor(&self) -> Result<Option<UserId>>;
}

/// Products and categories.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Whether another product already uses `slug`.
    async fn slug_taken(&self, slug: &str, exclude: Option<ProductId>) -> Result<bool>;

    /// Whether another product already uses `sku`.
    async fn sku_taken(&self, sku: &str, exclude: Option<ProductId>) -> Result<bool>;

    /// Fails with `Conflict` on a duplicate slug or SKU.
    async fn insert_product(&self, fields: &ProductFields) -> Result<ProductId>;

    /// Returns `false` if nothing was deleted. Cart lines go with the product;
    /// order items keep their snapshot.
    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    async fn category(&self, id: CategoryId) -> Result<Option<Category>>;

    /// Case-insensitive name lookup.
    async fn category_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// The lowest-id category.
    async fn first_category(&self) -> Result<Option<Category>>;

    async fn category_slug_taken(&self, slug: &str) -> Result<bool>;

    /// Fails with `Conflict` on a duplicate name or slug.
    async fn insert_category(&self, name: &str, slug: &str) -> Result<Category>;
}

/// Per-user carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Lines joined with their products, newest first.
    async fn cart_entries(&self, user_id: UserId) -> Result<Vec<CartEntry>>;

    /// Insert a line or add `quantity` to the existing one, atomically.
    async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLine>;

    /// Returns `None` if the line does not exist or belongs to someone else.
    async fn set_cart_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<Option<CartLine>>;

    /// Returns `false` if the line does not exist or belongs to someone else.
    async fn remove_cart_line(&self, user_id: UserId, line_id: CartLineId) -> Result<bool>;
}

/// Order history.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>>;

    /// Returns `None` unless the order belongs to `user_id`.
    async fn order_detail(&self, user_id: UserId, order_id: OrderId)
    -> Result<Option<OrderDetail>>;
}

/// Everything the services need from persistence.
#[async_trait]
pub trait Store: IdentityStore + CatalogStore + CartStore + OrderStore {
    /// Start a unit of work. Dropping it without `commit` rolls back.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<()>;
}

/// A transaction holding row locks until it commits or is dropped.
///
/// Locks taken here exclude every other unit of work touching the same rows.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Lock one product row.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Lock the user's cart lines, oldest first.
    async fn lock_cart(&mut self, user_id: UserId) -> Result<Vec<CartLine>>;

    /// Lock several product rows in ascending id order. Missing ids are skipped.
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Persist a stock change on a product locked by this unit of work.
    async fn write_stock(&mut self, id: ProductId, change: StockChange) -> Result<()>;

    /// Rewrite a locked product's editable columns. Fails with `Conflict` on a
    /// duplicate slug or SKU.
    async fn update_product(&mut self, id: ProductId, fields: &ProductFields) -> Result<()>;

    /// Returns `None` if the order number is already taken.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Option<Order>>;

    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>>;

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<Payment>;

    /// Delete the given lines of `user_id`'s cart.
    async fn delete_cart_lines(&mut self, user_id: UserId, ids: &[CartLineId]) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
