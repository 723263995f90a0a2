//! Database operations for orders, order items and payments.
//!
//! Inserts run inside the checkout transaction; reads use the pool.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};

use bika_core::{
    CurrencyCode, OrderId, OrderItemId, OrderStatus, PaymentId, PaymentMethod, PaymentStatus,
    ProductId, UserId,
};

use super::{RepositoryError, Result};
use crate::models::{
    NewOrder, NewOrderItem, NewPayment, Order, OrderDetail, OrderItem, OrderSummary, Payment,
};

const ORDER_COLUMNS: &str = "id, user_id, order_number, total_amount, status, \
     shipping_address, billing_address, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, quantity, unit_price";
const PAYMENT_COLUMNS: &str = "id, order_id, method, amount, currency, status, \
     external_reference, mobile_money_phone, payer_email, created_at, paid_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    order_number: String,
    total_amount: Decimal,
    status: OrderStatus,
    shipping_address: String,
    billing_address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            order_number: row.order_number,
            total_amount: row.total_amount,
            status: row.status,
            shipping_address: row.shipping_address,
            billing_address: row.billing_address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderSummaryRow {
    #[sqlx(flatten)]
    order: OrderRow,
    item_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: Option<i64>,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: row.product_id.map(ProductId::new),
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    order_id: i64,
    method: PaymentMethod,
    amount: Decimal,
    currency: String,
    status: PaymentStatus,
    external_reference: Option<String>,
    mobile_money_phone: Option<String>,
    payer_email: Option<String>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RepositoryError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        let currency = row
            .currency
            .parse::<CurrencyCode>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: PaymentId::new(row.id),
            order_id: OrderId::new(row.order_id),
            method: row.method,
            amount: row.amount,
            currency,
            status: row.status,
            external_reference: row.external_reference,
            mobile_money_phone: row.mobile_money_phone,
            payer_email: row.payer_email,
            created_at: row.created_at,
            paid_at: row.paid_at,
        })
    }
}

// =============================================================================
// Checkout inserts (transaction)
// =============================================================================

/// Insert an order unless its number is taken.
pub(super) async fn insert_order<'e>(
    executor: impl PgExecutor<'e>,
    order: &NewOrder,
) -> Result<Option<Order>> {
    let sql = format!(
        r"
        INSERT INTO bika.customer_order (
            user_id, order_number, total_amount, status, shipping_address, billing_address
        )
        VALUES ($1, $2, $3, 'pending', $4, $5)
        ON CONFLICT (order_number) DO NOTHING
        RETURNING {ORDER_COLUMNS}
        "
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order.user_id.as_i64())
        .bind(&order.order_number)
        .bind(order.total_amount)
        .bind(&order.shipping_address)
        .bind(&order.billing_address)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Order::from))
}

pub(super) async fn insert_item<'e>(
    executor: impl PgExecutor<'e>,
    order_id: OrderId,
    item: &NewOrderItem,
) -> Result<OrderItem> {
    let sql = format!(
        r"
        INSERT INTO bika.order_item (order_id, product_id, product_name, quantity, unit_price)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ITEM_COLUMNS}
        "
    );
    let row = sqlx::query_as::<_, OrderItemRow>(&sql)
        .bind(order_id.as_i64())
        .bind(item.product_id.as_i64())
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .fetch_one(executor)
        .await?;
    Ok(OrderItem::from(row))
}

pub(super) async fn insert_payment<'e>(
    executor: impl PgExecutor<'e>,
    payment: &NewPayment,
) -> Result<Payment> {
    let sql = format!(
        r"
        INSERT INTO bika.payment (
            order_id, method, amount, currency, status, external_reference,
            mobile_money_phone, payer_email, paid_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {PAYMENT_COLUMNS}
        "
    );
    let row = sqlx::query_as::<_, PaymentRow>(&sql)
        .bind(payment.order_id.as_i64())
        .bind(payment.method)
        .bind(payment.amount)
        .bind(payment.currency.code())
        .bind(payment.status)
        .bind(&payment.external_reference)
        .bind(&payment.mobile_money_phone)
        .bind(&payment.payer_email)
        .bind(payment.paid_at)
        .fetch_one(executor)
        .await?;
    Payment::try_from(row)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order history reads.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's orders with item counts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r"
            SELECT o.id, o.user_id, o.order_number, o.total_amount, o.status,
                   o.shipping_address, o.billing_address, o.created_at, o.updated_at,
                   (SELECT count(*) FROM bika.order_item i WHERE i.order_id = o.id) AS item_count
            FROM bika.customer_order o
            WHERE o.user_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(user_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| OrderSummary {
                order: Order::from(row.order),
                item_count: row.item_count,
            })
            .collect())
    }

    /// One of the user's orders with items and payments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if a payment row is invalid.
    pub async fn detail(&self, user_id: UserId, order_id: OrderId) -> Result<Option<OrderDetail>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM bika.customer_order WHERE id = $1 AND user_id = $2"
        );
        let Some(order) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id.as_i64())
            .bind(user_id.as_i64())
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let sql = format!("SELECT {ITEM_COLUMNS} FROM bika.order_item WHERE order_id = $1 ORDER BY id");
        let items = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(order_id.as_i64())
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(OrderItem::from)
            .collect();

        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM bika.payment WHERE order_id = $1 ORDER BY id");
        let payments = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(order_id.as_i64())
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(Payment::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(OrderDetail {
            order: Order::from(order),
            items,
            payments,
        }))
    }
}
