//! [`Store`] backed by `PostgreSQL`.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use bika_core::inventory::StockChange;
use bika_core::{CartLineId, CategoryId, OrderId, ProductId, UserId};

use super::{
    CartRepository, CartStore, CatalogStore, IdentityRepository, IdentityStore, OrderRepository,
    OrderStore, ProductRepository, Result, Store, UnitOfWork, carts, orders, products,
};
use crate::models::{
    Account, CartEntry, CartLine, Category, NewOrder, NewOrderItem, NewPayment, Order,
    OrderDetail, OrderItem, OrderSummary, Payment, Product, ProductFields, ProductQuery,
};

/// Production store over a connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn find_account(&self, id: UserId) -> Result<Option<Account>> {
        IdentityRepository::new(&self.pool).find_active(id).await
    }

    async fn first_active_vendor(&self) -> Result<Option<UserId>> {
        IdentityRepository::new(&self.pool).first_active_vendor().await
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        ProductRepository::new(&self.pool).list(query).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        ProductRepository::new(&self.pool).get(id).await
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<ProductId>) -> Result<bool> {
        ProductRepository::new(&self.pool).slug_taken(slug, exclude).await
    }

    async fn sku_taken(&self, sku: &str, exclude: Option<ProductId>) -> Result<bool> {
        ProductRepository::new(&self.pool).sku_taken(sku, exclude).await
    }

    async fn insert_product(&self, fields: &ProductFields) -> Result<ProductId> {
        ProductRepository::new(&self.pool).insert(fields).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        ProductRepository::new(&self.pool).delete(id).await
    }

    async fn category(&self, id: CategoryId) -> Result<Option<Category>> {
        ProductRepository::new(&self.pool).category(id).await
    }

    async fn category_by_name(&self, name: &str) -> Result<Option<Category>> {
        ProductRepository::new(&self.pool).category_by_name(name).await
    }

    async fn first_category(&self) -> Result<Option<Category>> {
        ProductRepository::new(&self.pool).first_category().await
    }

    async fn category_slug_taken(&self, slug: &str) -> Result<bool> {
        ProductRepository::new(&self.pool).category_slug_taken(slug).await
    }

    async fn insert_category(&self, name: &str, slug: &str) -> Result<Category> {
        ProductRepository::new(&self.pool).insert_category(name, slug).await
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart_entries(&self, user_id: UserId) -> Result<Vec<CartEntry>> {
        CartRepository::new(&self.pool).entries(user_id).await
    }

    async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLine> {
        CartRepository::new(&self.pool)
            .add(user_id, product_id, quantity)
            .await
    }

    async fn set_cart_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<Option<CartLine>> {
        CartRepository::new(&self.pool)
            .set_quantity(user_id, line_id, quantity)
            .await
    }

    async fn remove_cart_line(&self, user_id: UserId, line_id: CartLineId) -> Result<bool> {
        CartRepository::new(&self.pool).remove(user_id, line_id).await
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>> {
        OrderRepository::new(&self.pool).for_user(user_id).await
    }

    async fn order_detail(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<OrderDetail>> {
        OrderRepository::new(&self.pool)
            .detail(user_id, order_id)
            .await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// A database transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        products::fetch_product(&mut *self.tx, id, true).await
    }

    async fn lock_cart(&mut self, user_id: UserId) -> Result<Vec<CartLine>> {
        carts::lock_cart(&mut *self.tx, user_id).await
    }

    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        products::lock_products(&mut *self.tx, ids).await
    }

    async fn write_stock(&mut self, id: ProductId, change: StockChange) -> Result<()> {
        products::write_stock(&mut *self.tx, id, change.quantity, change.status).await
    }

    async fn update_product(&mut self, id: ProductId, fields: &ProductFields) -> Result<()> {
        products::update_product(&mut *self.tx, id, fields).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Option<Order>> {
        orders::insert_order(&mut *self.tx, order).await
    }

    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>> {
        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            inserted.push(orders::insert_item(&mut *self.tx, order_id, item).await?);
        }
        Ok(inserted)
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<Payment> {
        orders::insert_payment(&mut *self.tx, payment).await
    }

    async fn delete_cart_lines(&mut self, user_id: UserId, ids: &[CartLineId]) -> Result<u64> {
        carts::delete_lines(&mut *self.tx, user_id, ids).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
