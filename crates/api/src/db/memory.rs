//! [`Store`] kept in process memory.
//!
//! Used by tests and local demos. A unit of work takes the store-wide lock,
//! edits a private copy of the state and swaps it in on commit, so a dropped
//! unit of work leaves no trace and concurrent units of work serialise the
//! same way row locks would.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use bika_core::inventory::StockChange;
use bika_core::{
    CartLineId, CategoryId, Identity, OrderId, OrderItemId, OrderStatus, PaymentId, ProductId,
    UnitId, UserId, UserType,
};

use super::{
    CartStore, CatalogStore, IdentityStore, OrderStore, RepositoryError, Result, Store, UnitOfWork,
};
use crate::models::{
    Account, CartEntry, CartLine, Category, NewAccount, NewOrder, NewOrderItem, NewPayment, Order,
    OrderDetail, OrderItem, OrderSummary, Payment, Product, ProductFields, ProductQuery,
};

/// Failures the store can be told to produce, for exercising rollback paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Fault {
    /// `write_stock` fails.
    StockWrite,
    /// `insert_order_items` fails.
    OrderItems,
    /// `insert_payment` fails.
    PaymentInsert,
    /// `delete_cart_lines` fails.
    CartClear,
    /// `insert_order` reports every order number as taken.
    OrderNumberTaken,
}

#[derive(Debug, Clone)]
struct StoredAccount {
    account: Account,
    is_active: bool,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    units: BTreeMap<UnitId, String>,
    accounts: BTreeMap<UserId, StoredAccount>,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    cart: BTreeMap<CartLineId, CartLine>,
    orders: BTreeMap<OrderId, Order>,
    items: BTreeMap<OrderItemId, OrderItem>,
    payments: BTreeMap<PaymentId, Payment>,
    faults: BTreeSet<Fault>,
}

/// The persistent part of the store, for before/after comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub products: Vec<Product>,
    pub cart: Vec<CartLine>,
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn fail_if(&self, fault: Fault) -> Result<()> {
        if self.faults.contains(&fault) {
            return Err(RepositoryError::DataCorruption(format!(
                "injected fault: {fault:?}"
            )));
        }
        Ok(())
    }

    fn unit_of(&self, user_id: Option<UserId>) -> Option<UnitId> {
        user_id
            .and_then(|id| self.accounts.get(&id))
            .and_then(|stored| stored.account.identity.unit_id)
    }

    /// Refresh the joined columns the way the SQL join would.
    fn hydrate(&self, product: &Product) -> Product {
        let mut product = product.clone();
        product.creator_unit_id = self.unit_of(product.created_by);
        product.vendor_unit_id = self.unit_of(product.vendor_id);
        if let Some(category) = self.categories.get(&product.category_id) {
            product.category_name.clone_from(&category.name);
        }
        product
    }

    fn product(&self, id: ProductId) -> Option<Product> {
        self.products.get(&id).map(|p| self.hydrate(p))
    }

    fn unique_taken(&self, exclude: Option<ProductId>, taken: impl Fn(&Product) -> bool) -> bool {
        self.products
            .values()
            .any(|p| Some(p.id) != exclude && taken(p))
    }

    fn check_unique(&self, fields: &ProductFields, exclude: Option<ProductId>) -> Result<()> {
        if self.unique_taken(exclude, |p| p.slug == fields.slug) {
            return Err(RepositoryError::Conflict("product_slug_key".to_owned()));
        }
        if self.unique_taken(exclude, |p| p.sku == fields.sku) {
            return Err(RepositoryError::Conflict("product_sku_key".to_owned()));
        }
        if !self.categories.contains_key(&fields.category_id) {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            products: self.products.values().cloned().collect(),
            cart: self.cart.values().cloned().collect(),
            orders: self.orders.values().cloned().collect(),
            items: self.items.values().cloned().collect(),
            payments: self.payments.values().cloned().collect(),
        }
    }
}

fn apply_fields(product: &mut Product, fields: &ProductFields, now: DateTime<Utc>) {
    product.name.clone_from(&fields.name);
    product.slug.clone_from(&fields.slug);
    product.sku.clone_from(&fields.sku);
    product.description.clone_from(&fields.description);
    product.category_id = fields.category_id;
    product.vendor_id = fields.vendor_id;
    product.visibility = fields.visibility;
    product.status = fields.status;
    product.price = fields.price;
    product.compare_price = fields.compare_price;
    product.stock_quantity = fields.stock_quantity;
    product.track_inventory = fields.track_inventory;
    product.low_stock_threshold = fields.low_stock_threshold;
    product.published_at = fields.published_at;
    product.updated_at = now;
}

/// In-memory store. Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a unit.
    pub async fn add_unit(&self, name: &str) -> UnitId {
        let mut state = self.state.lock().await;
        let id = UnitId::new(state.next_id());
        state.units.insert(id, name.to_owned());
        id
    }

    /// Create an account and return its identity.
    pub async fn add_account(&self, new: NewAccount) -> Identity {
        let mut state = self.state.lock().await;
        let id = UserId::new(state.next_id());
        let identity = Identity {
            id,
            is_superuser: new.is_superuser,
            role: new.role,
            user_type: new.user_type,
            unit_id: new.unit_id,
        };
        let unit = new.unit_id.and_then(|unit| state.units.get(&unit).cloned());
        state.accounts.insert(
            id,
            StoredAccount {
                account: Account {
                    identity: identity.clone(),
                    username: new.username,
                    email: new.email,
                    unit,
                },
                is_active: new.is_active,
            },
        );
        identity
    }

    /// Make every later matching operation fail until [`Self::clear_faults`].
    pub async fn inject_fault(&self, fault: Fault) {
        self.state.lock().await.faults.insert(fault);
    }

    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }

    /// Products, carts, orders, items and payments as they are now.
    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_account(&self, id: UserId) -> Result<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .get(&id)
            .filter(|stored| stored.is_active)
            .map(|stored| stored.account.clone()))
    }

    async fn first_active_vendor(&self) -> Result<Option<UserId>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|stored| {
                stored.is_active && stored.account.identity.user_type == UserType::Vendor
            })
            .map(|stored| stored.account.identity.id))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .map(|p| state.hydrate(p))
            .filter(|p| query.matches(p))
            .collect();

        products.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        if let Some(limit) = query.limit {
            products.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().await.product(id))
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<ProductId>) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.unique_taken(exclude, |p| p.slug == slug))
    }

    async fn sku_taken(&self, sku: &str, exclude: Option<ProductId>) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.unique_taken(exclude, |p| p.sku == sku))
    }

    async fn insert_product(&self, fields: &ProductFields) -> Result<ProductId> {
        let mut state = self.state.lock().await;
        state.check_unique(fields, None)?;

        let id = ProductId::new(state.next_id());
        let now = Utc::now();
        let mut product = Product {
            id,
            name: String::new(),
            slug: String::new(),
            sku: String::new(),
            description: String::new(),
            category_id: fields.category_id,
            category_name: String::new(),
            created_by: fields.created_by,
            vendor_id: None,
            creator_unit_id: None,
            vendor_unit_id: None,
            visibility: fields.visibility,
            status: fields.status,
            price: fields.price,
            compare_price: None,
            stock_quantity: 0,
            track_inventory: true,
            low_stock_threshold: 0,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        apply_fields(&mut product, fields, now);
        state.products.insert(id, product);
        Ok(id)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.products.remove(&id).is_none() {
            return Ok(false);
        }
        state.cart.retain(|_, line| line.product_id != id);
        for item in state.items.values_mut() {
            if item.product_id == Some(id) {
                item.product_id = None;
            }
        }
        Ok(true)
    }

    async fn category(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.state.lock().await.categories.get(&id).cloned())
    }

    async fn category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let state = self.state.lock().await;
        let name = name.to_lowercase();
        Ok(state
            .categories
            .values()
            .find(|c| c.name.to_lowercase() == name)
            .cloned())
    }

    async fn first_category(&self) -> Result<Option<Category>> {
        Ok(self.state.lock().await.categories.values().next().cloned())
    }

    async fn category_slug_taken(&self, slug: &str) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.categories.values().any(|c| c.slug == slug))
    }

    async fn insert_category(&self, name: &str, slug: &str) -> Result<Category> {
        let mut state = self.state.lock().await;
        if state
            .categories
            .values()
            .any(|c| c.name == name || c.slug == slug)
        {
            return Err(RepositoryError::Conflict("category_slug_key".to_owned()));
        }
        let category = Category {
            id: CategoryId::new(state.next_id()),
            name: name.to_owned(),
            slug: slug.to_owned(),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_entries(&self, user_id: UserId) -> Result<Vec<CartEntry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<CartEntry> = state
            .cart
            .values()
            .filter(|line| line.user_id == user_id)
            .filter_map(|line| {
                state.product(line.product_id).map(|product| CartEntry {
                    line: line.clone(),
                    product,
                })
            })
            .collect();
        entries.sort_by(|a, b| (b.line.added_at, b.line.id).cmp(&(a.line.added_at, a.line.id)));
        Ok(entries)
    }

    async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLine> {
        let mut state = self.state.lock().await;
        if !state.products.contains_key(&product_id) {
            return Err(RepositoryError::NotFound);
        }

        let now = Utc::now();
        if let Some(line) = state
            .cart
            .values_mut()
            .find(|line| line.user_id == user_id && line.product_id == product_id)
        {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(RepositoryError::OutOfRange)?;
            line.updated_at = now;
            return Ok(line.clone());
        }

        let line = CartLine {
            id: CartLineId::new(state.next_id()),
            user_id,
            product_id,
            quantity,
            added_at: now,
            updated_at: now,
        };
        state.cart.insert(line.id, line.clone());
        Ok(line)
    }

    async fn set_cart_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<Option<CartLine>> {
        let mut state = self.state.lock().await;
        Ok(state
            .cart
            .get_mut(&line_id)
            .filter(|line| line.user_id == user_id)
            .map(|line| {
                line.quantity = quantity;
                line.updated_at = Utc::now();
                line.clone()
            }))
    }

    async fn remove_cart_line(&self, user_id: UserId, line_id: CartLineId) -> Result<bool> {
        let mut state = self.state.lock().await;
        let owned = state
            .cart
            .get(&line_id)
            .is_some_and(|line| line.user_id == user_id);
        if owned {
            state.cart.remove(&line_id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>> {
        let state = self.state.lock().await;
        let mut orders: Vec<OrderSummary> = state
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .map(|order| OrderSummary {
                order: order.clone(),
                item_count: state
                    .items
                    .values()
                    .filter(|item| item.order_id == order.id)
                    .map(|_| 1_i64)
                    .sum(),
            })
            .collect();
        orders.sort_by(|a, b| (b.order.created_at, b.order.id).cmp(&(a.order.created_at, a.order.id)));
        Ok(orders)
    }

    async fn order_detail(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<OrderDetail>> {
        let state = self.state.lock().await;
        let Some(order) = state
            .orders
            .get(&order_id)
            .filter(|order| order.user_id == user_id)
        else {
            return Ok(None);
        };

        Ok(Some(OrderDetail {
            order: order.clone(),
            items: state
                .items
                .values()
                .filter(|item| item.order_id == order_id)
                .cloned()
                .collect(),
            payments: state
                .payments
                .values()
                .filter(|payment| payment.order_id == order_id)
                .cloned()
                .collect(),
        }))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Holds the store lock; edits `working` and swaps it in on commit.
struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.working.product(id))
    }

    async fn lock_cart(&mut self, user_id: UserId) -> Result<Vec<CartLine>> {
        let mut lines: Vec<CartLine> = self
            .working
            .cart
            .values()
            .filter(|line| line.user_id == user_id)
            .cloned()
            .collect();
        lines.sort_by_key(|line| (line.added_at, line.id));
        Ok(lines)
    }

    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let ids: BTreeSet<ProductId> = ids.iter().copied().collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.working.product(id))
            .collect())
    }

    async fn write_stock(&mut self, id: ProductId, change: StockChange) -> Result<()> {
        self.working.fail_if(Fault::StockWrite)?;
        let product = self
            .working
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if product.track_inventory && change.quantity < 0 {
            return Err(RepositoryError::Conflict(
                "product_tracked_stock_non_negative".to_owned(),
            ));
        }
        product.stock_quantity = change.quantity;
        product.status = change.status;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn update_product(&mut self, id: ProductId, fields: &ProductFields) -> Result<()> {
        self.working.check_unique(fields, Some(id))?;
        let product = self
            .working
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if fields.track_inventory && fields.stock_quantity < 0 {
            return Err(RepositoryError::Conflict(
                "product_tracked_stock_non_negative".to_owned(),
            ));
        }
        apply_fields(product, fields, Utc::now());
        Ok(())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Option<Order>> {
        let taken = self.working.faults.contains(&Fault::OrderNumberTaken)
            || self
                .working
                .orders
                .values()
                .any(|existing| existing.order_number == order.order_number);
        if taken {
            return Ok(None);
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(self.working.next_id()),
            user_id: order.user_id,
            order_number: order.order_number.clone(),
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            shipping_address: order.shipping_address.clone(),
            billing_address: order.billing_address.clone(),
            created_at: now,
            updated_at: now,
        };
        self.working.orders.insert(order.id, order.clone());
        Ok(Some(order))
    }

    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>> {
        self.working.fail_if(Fault::OrderItems)?;
        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let item = OrderItem {
                id: OrderItemId::new(self.working.next_id()),
                order_id,
                product_id: Some(item.product_id),
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            };
            self.working.items.insert(item.id, item.clone());
            inserted.push(item);
        }
        Ok(inserted)
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<Payment> {
        self.working.fail_if(Fault::PaymentInsert)?;
        let payment = Payment {
            id: PaymentId::new(self.working.next_id()),
            order_id: payment.order_id,
            method: payment.method,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
            external_reference: payment.external_reference.clone(),
            mobile_money_phone: payment.mobile_money_phone.clone(),
            payer_email: payment.payer_email.clone(),
            created_at: Utc::now(),
            paid_at: payment.paid_at,
        };
        self.working.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn delete_cart_lines(&mut self, user_id: UserId, ids: &[CartLineId]) -> Result<u64> {
        self.working.fail_if(Fault::CartClear)?;
        let before = self.working.cart.len();
        self.working
            .cart
            .retain(|id, line| !(line.user_id == user_id && ids.contains(id)));
        Ok(u64::try_from(before - self.working.cart.len()).unwrap_or(u64::MAX))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let Self {
            mut guard,
            mut working,
        } = *self;
        // Faults are test configuration, not transactional data.
        working.faults = std::mem::take(&mut guard.faults);
        *guard = working;
        Ok(())
    }
}
