//! Cart-to-order conversion.
//!
//! A checkout runs as one unit of work:
//!
//! 1. **Collecting** - lock the caller's cart lines, then their product rows
//!    in ascending id order.
//! 2. **Validating** - revalidate visibility, status and stock against the
//!    locked rows and compute the frozen totals ([`bika_core::checkout::plan`]).
//! 3. **Committing** - insert the order and items, decrement tracked stock,
//!    charge the payment gateway, record the payment, clear the consumed
//!    cart lines and commit.
//!
//! Any failure drops the unit of work, so the cart, stock and order tables
//! are left exactly as they were.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use bika_core::checkout::{Addresses, CheckoutLine, CheckoutStage, plan};
use bika_core::naming::order_number;
use bika_core::policy::is_purchasable;
use bika_core::{
    CartLineId, CommerceError, CurrencyCode, Identity, OrderId, OrderStatus, PaymentId,
    PaymentMethod, PaymentStatus, ProductId,
};

use super::payment::{ChargeOutcome, ChargeRequest, PaymentGateway};
use super::{Result, ServiceError};
use crate::config::CheckoutSettings;
use crate::db::{Store, UnitOfWork};
use crate::error::add_breadcrumb;
use crate::models::{NewOrder, NewOrderItem, NewPayment, Order};

/// Checkout payload as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: String,
    pub billing_address: Option<String>,
    pub payment_method: String,
    pub currency: Option<String>,
    pub mobile_money_phone: Option<String>,
    pub payer_email: Option<String>,
}

/// A request that passed the checks that need no locks.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValidatedRequest {
    addresses: Addresses,
    method: PaymentMethod,
    currency: CurrencyCode,
    mobile_money_phone: Option<String>,
    payer_email: Option<String>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

impl CheckoutRequest {
    fn validate(&self, default_currency: CurrencyCode) -> Result<ValidatedRequest> {
        let addresses =
            Addresses::resolve(&self.shipping_address, self.billing_address.as_deref())?;

        let method = self
            .payment_method
            .trim()
            .parse::<PaymentMethod>()
            .map_err(|_| {
                CommerceError::validation(format!(
                    "unsupported payment_method: {}",
                    self.payment_method
                ))
            })?;

        let currency = match non_blank(self.currency.as_ref()) {
            Some(code) => code.parse::<CurrencyCode>().map_err(|_| {
                CommerceError::validation(format!("unsupported currency: {code}"))
            })?,
            None => default_currency,
        };

        let payer_email = non_blank(self.payer_email.as_ref());
        if payer_email.as_deref().is_some_and(|email| !email.contains('@')) {
            return Err(CommerceError::validation("payer_email is not a valid email address").into());
        }

        Ok(ValidatedRequest {
            addresses,
            method,
            currency,
            mobile_money_phone: non_blank(self.mobile_money_phone.as_ref()),
            payer_email,
        })
    }
}

/// What a committed checkout returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub order_number: String,
    pub total_amount: Decimal,
    pub order_status: OrderStatus,
    pub payment_id: PaymentId,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub currency: CurrencyCode,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewLine {
    pub cart_line_id: CartLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub is_available: bool,
}

/// Unlocked estimate of what checkout would charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub lines: Vec<PreviewLine>,
    pub subtotal: Decimal,
    pub total_items: i64,
}

pub struct CheckoutService<'a> {
    store: &'a dyn Store,
    gateway: &'a dyn PaymentGateway,
    settings: CheckoutSettings,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        gateway: &'a dyn PaymentGateway,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    /// Price the caller's cart at current prices without locking anything.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn preview(&self, identity: &Identity) -> Result<Preview> {
        let entries = self.store.cart_entries(identity.id).await?;

        let lines: Vec<PreviewLine> = entries
            .iter()
            .map(|entry| {
                let unit_price = entry.product.final_price();
                PreviewLine {
                    cart_line_id: entry.line.id,
                    product_id: entry.product.id,
                    product_name: entry.product.name.clone(),
                    quantity: entry.line.quantity,
                    unit_price,
                    line_total: unit_price * Decimal::from(entry.line.quantity),
                    is_available: is_purchasable(identity, &entry.product.access()),
                }
            })
            .collect();

        Ok(Preview {
            subtotal: lines.iter().map(|l| l.line_total).sum(),
            total_items: lines.iter().map(|l| i64::from(l.quantity)).sum(),
            lines,
        })
    }

    /// Convert the caller's cart into an order, a payment and decremented stock.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank shipping address or an unsupported method
    ///   or currency, before anything is locked.
    /// - `EmptyCart`, `ProductUnavailable` or `InsufficientStock` from
    ///   revalidation under lock.
    /// - `PaymentFailed` if the gateway errors, times out or declines.
    ///
    /// Nothing is written unless the whole checkout succeeds.
    #[instrument(skip(self, identity, request), fields(user_id = %identity.id))]
    pub async fn checkout(
        &self,
        identity: &Identity,
        request: &CheckoutRequest,
    ) -> Result<CheckoutReceipt> {
        let request = request.validate(self.settings.default_currency)?;

        let mut stage = CheckoutStage::Collecting;
        let result = self.run(identity, &request, &mut stage).await;

        match &result {
            Ok(receipt) => {
                info!(
                    order_number = %receipt.order_number,
                    total_amount = %receipt.total_amount,
                    payment_status = %receipt.payment_status,
                    "Checkout committed"
                );
                add_breadcrumb(
                    "checkout",
                    "Order created",
                    Some(&[("order_number", receipt.order_number.as_str())]),
                );
            }
            Err(err) => warn!(%stage, error = %err, "Checkout aborted"),
        }
        result
    }

    async fn run(
        &self,
        identity: &Identity,
        request: &ValidatedRequest,
        stage: &mut CheckoutStage,
    ) -> Result<CheckoutReceipt> {
        let mut uow = self.store.begin().await?;

        let cart = uow.lock_cart(identity.id).await?;
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart.into());
        }
        let product_ids: Vec<ProductId> = cart.iter().map(|line| line.product_id).collect();
        let products = uow.lock_products(&product_ids).await?;

        let mut lines = Vec::with_capacity(cart.len());
        for line in &cart {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or(CommerceError::ProductUnavailable {
                    product_id: line.product_id,
                })?;
            lines.push(CheckoutLine {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.final_price(),
                access: product.access(),
                stock: product.stock(),
            });
        }

        *stage = CheckoutStage::Validating;
        let plan = plan(identity, &lines)?;

        *stage = CheckoutStage::Committing;
        let order = self
            .insert_order(uow.as_mut(), identity, request, plan.subtotal)
            .await?;

        let items: Vec<NewOrderItem> = plan
            .lines
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();
        uow.insert_order_items(order.id, &items).await?;

        for line in &plan.lines {
            if let Some(change) = line.stock_change {
                uow.write_stock(line.product_id, change).await?;
            }
        }

        let outcome = self.charge(&order, request).await?;
        let payment = uow
            .insert_payment(&NewPayment {
                order_id: order.id,
                method: request.method,
                amount: plan.subtotal,
                currency: request.currency,
                status: outcome.status,
                external_reference: outcome.external_reference,
                mobile_money_phone: request.mobile_money_phone.clone(),
                payer_email: request.payer_email.clone(),
                paid_at: (outcome.status == PaymentStatus::Completed).then(Utc::now),
            })
            .await?;

        let consumed: Vec<CartLineId> = cart.iter().map(|line| line.id).collect();
        uow.delete_cart_lines(identity.id, &consumed).await?;
        uow.commit().await?;

        Ok(CheckoutReceipt {
            order_id: order.id,
            order_number: order.order_number,
            total_amount: order.total_amount,
            order_status: order.status,
            payment_id: payment.id,
            payment_status: payment.status,
            payment_method: payment.method,
            currency: payment.currency,
            created_at: order.created_at,
        })
    }

    /// Insert the order, drawing a fresh number on every collision.
    async fn insert_order(
        &self,
        uow: &mut dyn UnitOfWork,
        identity: &Identity,
        request: &ValidatedRequest,
        total_amount: Decimal,
    ) -> Result<Order> {
        let attempts = self.settings.order_number_attempts;
        for attempt in 1..=attempts {
            let number = order_number(Utc::now().date_naive(), &mut rand::rng());
            let new = NewOrder {
                user_id: identity.id,
                order_number: number,
                total_amount,
                shipping_address: request.addresses.shipping.clone(),
                billing_address: request.addresses.billing.clone(),
            };

            if let Some(order) = uow.insert_order(&new).await? {
                return Ok(order);
            }
            warn!(order_number = %new.order_number, attempt, "Order number taken");
        }

        Err(ServiceError::Internal(format!(
            "no free order number after {attempts} attempts"
        )))
    }

    async fn charge(&self, order: &Order, request: &ValidatedRequest) -> Result<ChargeOutcome> {
        let charge = ChargeRequest {
            order_number: order.order_number.clone(),
            amount: order.total_amount,
            currency: request.currency,
            method: request.method,
            mobile_money_phone: request.mobile_money_phone.clone(),
            payer_email: request.payer_email.clone(),
        };

        match tokio::time::timeout(self.settings.payment_timeout, self.gateway.charge(&charge))
            .await
        {
            Ok(Ok(outcome)) if outcome.is_rejected() => Err(CommerceError::PaymentFailed(
                format!("payment {}", outcome.status),
            )
            .into()),
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(err)) => Err(CommerceError::PaymentFailed(err.to_string()).into()),
            Err(_) => Err(CommerceError::PaymentFailed(format!(
                "payment gateway did not answer within {:?}",
                self.settings.payment_timeout
            ))
            .into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::db::memory::Fault;
    use crate::db::{CartStore, CatalogStore, MemoryStore, OrderStore};
    use crate::services::catalog::CatalogService;
    use crate::services::payment::{OfflineSettlement, PaymentError};
    use crate::services::testing::World;
    use bika_core::{ProductStatus, Visibility};

    fn rejected(err: ServiceError) -> CommerceError {
        match err {
            ServiceError::Rejected(err) => err,
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    fn request(method: &str) -> CheckoutRequest {
        CheckoutRequest {
            shipping_address: "KG 7 Ave, Kigali".to_owned(),
            payment_method: method.to_owned(),
            ..CheckoutRequest::default()
        }
    }

    fn checkout<'a>(store: &'a MemoryStore, gateway: &'a dyn PaymentGateway) -> CheckoutService<'a> {
        CheckoutService::new(store, gateway, CheckoutSettings::default())
    }

    struct Declining;

    #[async_trait]
    impl PaymentGateway for Declining {
        async fn charge(&self, _request: &ChargeRequest) -> std::result::Result<ChargeOutcome, PaymentError> {
            Err(PaymentError::Declined("insufficient funds".to_owned()))
        }
    }

    struct Cancelling;

    #[async_trait]
    impl PaymentGateway for Cancelling {
        async fn charge(&self, _request: &ChargeRequest) -> std::result::Result<ChargeOutcome, PaymentError> {
            Ok(ChargeOutcome {
                status: PaymentStatus::Cancelled,
                external_reference: None,
            })
        }
    }

    struct Stalled;

    #[async_trait]
    impl PaymentGateway for Stalled {
        async fn charge(&self, _request: &ChargeRequest) -> std::result::Result<ChargeOutcome, PaymentError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(PaymentError::Unavailable("never answered".to_owned()))
        }
    }

    #[tokio::test]
    async fn test_checkout_commits_order_payment_and_stock() {
        let world = World::new().await;
        let product = world.stocked(&world.creator, "Coffee", 1000, 5).await;
        world.store.add_to_cart(world.member.id, product.id, 2).await.unwrap();

        let receipt = checkout(&world.store, &OfflineSettlement)
            .checkout(&world.member, &request("bank_transfer"))
            .await
            .unwrap();

        assert_eq!(receipt.total_amount, Decimal::new(2000, 2));
        assert_eq!(receipt.order_status, OrderStatus::Pending);
        assert_eq!(receipt.payment_status, PaymentStatus::Completed);
        assert_eq!(receipt.currency, CurrencyCode::RWF);
        assert!(receipt.order_number.starts_with("ORD"));
        assert_eq!(receipt.order_number.len(), 17);

        let product = world.store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 3);
        assert!(world.store.cart_entries(world.member.id).await.unwrap().is_empty());

        let detail = world
            .store
            .order_detail(world.member.id, receipt.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.order.billing_address, "KG 7 Ave, Kigali");
        assert_eq!(detail.items.len(), 1);
        let payment = detail.payments.first().unwrap();
        assert_eq!(payment.amount, Decimal::new(2000, 2));
        assert!(payment.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_mobile_money_payment_stays_pending() {
        let world = World::new().await;
        let product = world.stocked(&world.creator, "Coffee", 1000, 5).await;
        world.store.add_to_cart(world.member.id, product.id, 1).await.unwrap();

        let mut req = request("mtn_rw");
        req.mobile_money_phone = Some("+250788000000".to_owned());
        req.currency = Some("rwf".to_owned());
        let receipt = checkout(&world.store, &OfflineSettlement)
            .checkout(&world.member, &req)
            .await
            .unwrap();

        assert_eq!(receipt.payment_status, PaymentStatus::Pending);
        let detail = world
            .store
            .order_detail(world.member.id, receipt.order_id)
            .await
            .unwrap()
            .unwrap();
        let payment = detail.payments.first().unwrap();
        assert!(payment.paid_at.is_none());
        assert_eq!(payment.mobile_money_phone.as_deref(), Some("+250788000000"));
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_everything() {
        let world = World::new().await;
        let product = world.stocked(&world.creator, "Coffee", 1000, 3).await;
        world.store.add_to_cart(world.member.id, product.id, 10).await.unwrap();
        let before = world.store.snapshot().await;

        let err = checkout(&world.store, &OfflineSettlement)
            .checkout(&world.member, &request("visa"))
            .await
            .unwrap_err();

        assert_eq!(
            rejected(err),
            CommerceError::InsufficientStock {
                product_id: product.id,
                available: 3
            }
        );
        assert_eq!(world.store.snapshot().await, before);
        let cart = world.store.cart_entries(world.member.id).await.unwrap();
        assert_eq!(cart.first().unwrap().line.quantity, 10);
    }

    #[tokio::test]
    async fn test_private_product_in_stale_cart_is_unavailable() {
        let world = World::new().await;
        let mut fields = world.fields(&world.creator, "Secret Blend");
        fields.visibility = Visibility::Private;
        let secret = world.product(fields).await;
        world.store.add_to_cart(world.outsider.id, secret.id, 1).await.unwrap();

        let listed = CatalogService::new(&world.store)
            .list(&world.outsider, Default::default())
            .await
            .unwrap();
        assert!(listed.iter().all(|p| p.id != secret.id));

        let err = checkout(&world.store, &OfflineSettlement)
            .checkout(&world.outsider, &request("visa"))
            .await
            .unwrap_err();
        assert_eq!(
            rejected(err),
            CommerceError::ProductUnavailable {
                product_id: secret.id
            }
        );
    }

    #[tokio::test]
    async fn test_unavailable_reported_before_stock() {
        let world = World::new().await;
        let oversold = world.stocked(&world.creator, "Coffee", 1000, 1).await;
        let mut fields = world.fields(&world.creator, "Retired Tea");
        fields.status = ProductStatus::Discontinued;
        let retired = world.product(fields).await;
        world.store.add_to_cart(world.member.id, oversold.id, 5).await.unwrap();
        world.store.add_to_cart(world.member.id, retired.id, 1).await.unwrap();

        let err = checkout(&world.store, &OfflineSettlement)
            .checkout(&world.member, &request("visa"))
            .await
            .unwrap_err();
        assert_eq!(
            rejected(err),
            CommerceError::ProductUnavailable {
                product_id: retired.id
            }
        );
    }

    #[tokio::test]
    async fn test_empty_cart_and_request_validation() {
        let world = World::new().await;
        let service = checkout(&world.store, &OfflineSettlement);

        let empty = service.checkout(&world.member, &request("visa")).await;
        assert_eq!(rejected(empty.unwrap_err()), CommerceError::EmptyCart);

        let method = service.checkout(&world.member, &request("cheque")).await;
        assert!(matches!(rejected(method.unwrap_err()), CommerceError::Validation(_)));

        let mut currency = request("visa");
        currency.currency = Some("GBP".to_owned());
        let currency = service.checkout(&world.member, &currency).await;
        assert!(matches!(rejected(currency.unwrap_err()), CommerceError::Validation(_)));

        let mut blank = request("visa");
        blank.shipping_address = "   ".to_owned();
        let blank = service.checkout(&world.member, &blank).await;
        assert!(matches!(rejected(blank.unwrap_err()), CommerceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_payment_failures_roll_back() {
        let world = World::new().await;
        let product = world.stocked(&world.creator, "Coffee", 1000, 5).await;
        world.store.add_to_cart(world.member.id, product.id, 2).await.unwrap();
        let before = world.store.snapshot().await;

        let declined = checkout(&world.store, &Declining)
            .checkout(&world.member, &request("visa"))
            .await;
        assert!(matches!(
            rejected(declined.unwrap_err()),
            CommerceError::PaymentFailed(_)
        ));
        assert_eq!(world.store.snapshot().await, before);

        let cancelled = checkout(&world.store, &Cancelling)
            .checkout(&world.member, &request("visa"))
            .await;
        assert!(matches!(
            rejected(cancelled.unwrap_err()),
            CommerceError::PaymentFailed(_)
        ));
        assert_eq!(world.store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_payment_timeout_rolls_back() {
        let world = World::new().await;
        let product = world.stocked(&world.creator, "Coffee", 1000, 5).await;
        world.store.add_to_cart(world.member.id, product.id, 2).await.unwrap();
        let before = world.store.snapshot().await;

        let settings = CheckoutSettings {
            payment_timeout: Duration::from_millis(50),
            ..CheckoutSettings::default()
        };
        let err = CheckoutService::new(&world.store, &Stalled, settings)
            .checkout(&world.member, &request("visa"))
            .await
            .unwrap_err();

        assert!(matches!(rejected(err), CommerceError::PaymentFailed(_)));
        assert_eq!(world.store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_store_faults_roll_back() {
        for fault in [
            Fault::StockWrite,
            Fault::OrderItems,
            Fault::PaymentInsert,
            Fault::CartClear,
        ] {
            let world = World::new().await;
            let product = world.stocked(&world.creator, "Coffee", 1000, 5).await;
            world.store.add_to_cart(world.member.id, product.id, 2).await.unwrap();
            let before = world.store.snapshot().await;

            world.store.inject_fault(fault).await;
            let err = checkout(&world.store, &OfflineSettlement)
                .checkout(&world.member, &request("bank_transfer"))
                .await
                .unwrap_err();

            assert!(matches!(err, ServiceError::Repository(_)), "{fault:?}");
            assert_eq!(world.store.snapshot().await, before, "{fault:?}");
        }
    }

    #[tokio::test]
    async fn test_order_number_exhaustion_is_fatal() {
        let world = World::new().await;
        let product = world.stocked(&world.creator, "Coffee", 1000, 5).await;
        world.store.add_to_cart(world.member.id, product.id, 1).await.unwrap();
        let before = world.store.snapshot().await;

        world.store.inject_fault(Fault::OrderNumberTaken).await;
        let err = checkout(&world.store, &OfflineSettlement)
            .checkout(&world.member, &request("visa"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Internal(_)));
        assert_eq!(world.store.snapshot().await, before);

        world.store.clear_faults().await;
        checkout(&world.store, &OfflineSettlement)
            .checkout(&world.member, &request("visa"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_order_total_frozen_after_price_change() {
        let world = World::new().await;
        let product = world.stocked(&world.creator, "Coffee", 1000, 5).await;
        world.store.add_to_cart(world.member.id, product.id, 3).await.unwrap();

        let receipt = checkout(&world.store, &OfflineSettlement)
            .checkout(&world.member, &request("visa"))
            .await
            .unwrap();

        let reprice = crate::services::catalog::ProductInput {
            price: Some(Decimal::new(9900, 2)),
            ..Default::default()
        };
        CatalogService::new(&world.store)
            .update(&world.creator, product.id, reprice)
            .await
            .unwrap();
        CatalogService::new(&world.store)
            .delete(&world.creator, product.id)
            .await
            .unwrap();

        let detail = world
            .store
            .order_detail(world.member.id, receipt.order_id)
            .await
            .unwrap()
            .unwrap();
        let item = detail.items.first().unwrap();
        assert_eq!(item.product_id, None);
        assert_eq!(item.product_name, "Coffee");
        assert_eq!(item.unit_price, Decimal::new(1000, 2));
        let recomputed: Decimal = detail.items.iter().map(|i| i.line_total()).sum();
        assert_eq!(recomputed, detail.order.total_amount);
        assert_eq!(detail.order.total_amount, Decimal::new(3000, 2));
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_never_oversell() {
        let world = World::new().await;
        let product = world.stocked(&world.creator, "Coffee", 1000, 3).await;

        let mut buyers = Vec::new();
        for n in 0..6 {
            let buyer = world
                .store
                .add_account(crate::models::NewAccount::new(format!("buyer{n}")).unit(world.unit))
                .await;
            world.store.add_to_cart(buyer.id, product.id, 1).await.unwrap();
            buyers.push(buyer);
        }

        let store = Arc::new(world.store.clone());
        let mut handles = Vec::new();
        for buyer in buyers {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                CheckoutService::new(store.as_ref(), &OfflineSettlement, CheckoutSettings::default())
                    .checkout(&buyer, &request("visa"))
                    .await
                    .is_ok()
            }));
        }

        let mut committed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                committed += 1;
            }
        }

        assert_eq!(committed, 3);
        let product = world.store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 0);
        assert_eq!(product.status, ProductStatus::OutOfStock);
    }

    #[tokio::test]
    async fn test_preview_prices_live() {
        let world = World::new().await;
        let coffee = world.stocked(&world.creator, "Coffee", 1000, 5).await;
        let tea = world.stocked(&world.creator, "Tea", 250, 5).await;
        world.store.add_to_cart(world.member.id, coffee.id, 2).await.unwrap();
        world.store.add_to_cart(world.member.id, tea.id, 4).await.unwrap();

        let preview = checkout(&world.store, &OfflineSettlement)
            .preview(&world.member)
            .await
            .unwrap();

        assert_eq!(preview.lines.len(), 2);
        assert_eq!(preview.total_items, 6);
        assert_eq!(preview.subtotal, Decimal::new(3000, 2));
        assert!(preview.lines.iter().all(|l| l.is_available));
    }
}
