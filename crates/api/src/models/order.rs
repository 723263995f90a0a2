//! Order, order item and payment models.
//!
//! Everything here is written once by checkout and never recomputed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bika_core::{
    CurrencyCode, OrderId, OrderItemId, OrderStatus, PaymentId, PaymentMethod, PaymentStatus,
    ProductId, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: String,
    /// Frozen at checkout.
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub billing_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    /// Cleared if the product is deleted later.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub status: PaymentStatus,
    pub external_reference: Option<String>,
    pub mobile_money_phone: Option<String>,
    pub payer_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// An order with its item count, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub item_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
}

/// Order row to insert. Status is always `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub order_number: String,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub billing_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub status: PaymentStatus,
    pub external_reference: Option<String>,
    pub mobile_money_phone: Option<String>,
    pub payer_email: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}
