//! Cart, checkout and order history over HTTP.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;

use bika_api::db::memory::Fault;
use bika_api::services::{ChargeOutcome, ChargeRequest, PaymentError, PaymentGateway};
use bika_integration_tests::{Cast, TestApp};

struct Declining;

#[async_trait]
impl PaymentGateway for Declining {
    async fn charge(&self, _request: &ChargeRequest) -> Result<ChargeOutcome, PaymentError> {
        Err(PaymentError::Declined("card expired".to_owned()))
    }
}

/// A unit-visible product owned by the creator with the given stock.
async fn product(app: &TestApp, cast: &Cast, name: &str, price: &str, stock: i32) -> i64 {
    app.create_product(
        &cast.creator,
        &json!({
            "name": name,
            "price": price,
            "stock_quantity": stock,
            "vendor": cast.creator.id,
        }),
    )
    .await
}

fn checkout_body(method: &str) -> serde_json::Value {
    json!({ "shipping_address": "KG 11 Ave, Kigali", "payment_method": method })
}

#[tokio::test]
async fn test_checkout_places_order_and_clears_cart() {
    let app = TestApp::new();
    let cast = app.cast().await;
    let id = product(&app, &cast, "Coffee Beans", "10.00", 5).await;

    let (status, line) = app
        .post("/api/v1/cart", &cast.member, &json!({ "product_id": id, "quantity": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(line["line_total"], "20.00");
    assert_eq!(line["is_available"], true);

    let (_, preview) = app.get("/api/v1/checkout/preview", &cast.member).await;
    assert_eq!(preview["subtotal"], "20.00");
    assert_eq!(preview["total_items"], 2);

    let (status, receipt) = app
        .post("/api/v1/checkout", &cast.member, &checkout_body("bank_transfer"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(receipt["total_amount"], "20.00");
    assert_eq!(receipt["order_status"], "pending");
    assert_eq!(receipt["payment_status"], "completed");
    assert_eq!(receipt["currency"], "RWF");
    assert!(receipt["order_number"].as_str().unwrap().starts_with("ORD"));

    let (_, product) = app.get(&format!("/api/v1/products/{id}"), &cast.member).await;
    assert_eq!(product["stock_quantity"], 3);

    let (_, cart) = app.get("/api/v1/cart", &cast.member).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());

    let (_, orders) = app.get("/api/v1/orders", &cast.member).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["item_count"], 1);

    let order_uri = format!("/api/v1/orders/{}", receipt["order_id"]);
    let (status, detail) = app.get(&order_uri, &cast.member).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["items"][0]["quantity"], 2);
    assert_eq!(detail["items"][0]["unit_price"], "10.00");
    assert_eq!(detail["payments"][0]["method"], "bank_transfer");
    assert!(detail["payments"][0]["paid_at"].is_string());

    let (status, _) = app.get(&order_uri, &cast.creator).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_everything_untouched() {
    let app = TestApp::new();
    let cast = app.cast().await;
    let id = product(&app, &cast, "Avocados", "2.50", 1).await;
    app.post("/api/v1/cart", &cast.member, &json!({ "product_id": id, "quantity": 3 }))
        .await;
    let before = app.store.snapshot().await;

    let (status, body) = app
        .post("/api/v1/checkout", &cast.member, &checkout_body("mtn_rw"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["product_id"], id);
    assert_eq!(body["available"], 1);
    assert_eq!(app.store.snapshot().await, before);
}

#[tokio::test]
async fn test_product_hidden_after_add_is_unavailable() {
    let app = TestApp::new();
    let cast = app.cast().await;
    let id = product(&app, &cast, "Mangoes", "3.00", 10).await;
    app.post("/api/v1/cart", &cast.member, &json!({ "product_id": id }))
        .await;

    let (status, _) = app
        .patch(
            &format!("/api/v1/products/{id}"),
            &cast.creator,
            &json!({ "visibility": "private" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, cart) = app.get("/api/v1/cart", &cast.member).await;
    assert_eq!(cart["lines"][0]["is_available"], false);

    let (status, body) = app
        .post("/api/v1/checkout", &cast.member, &checkout_body("visa"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "product_unavailable");

    let (_, list) = app.get("/api/v1/products", &cast.member).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_declined_payment_rolls_back() {
    let app = TestApp::with_gateway(Arc::new(Declining));
    let cast = app.cast().await;
    let id = product(&app, &cast, "Tea", "4.00", 5).await;
    app.post("/api/v1/cart", &cast.member, &json!({ "product_id": id, "quantity": 2 }))
        .await;
    let before = app.store.snapshot().await;

    let (status, body) = app
        .post("/api/v1/checkout", &cast.member, &checkout_body("visa"))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "payment_failed");
    assert_eq!(app.store.snapshot().await, before);
}

#[tokio::test]
async fn test_store_failure_is_hidden_and_rolled_back() {
    let app = TestApp::new();
    let cast = app.cast().await;
    let id = product(&app, &cast, "Sugar", "1.00", 5).await;
    app.post("/api/v1/cart", &cast.member, &json!({ "product_id": id }))
        .await;
    let before = app.store.snapshot().await;
    app.store.inject_fault(Fault::CartClear).await;

    let (status, body) = app
        .post("/api/v1/checkout", &cast.member, &checkout_body("mpesa"))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Internal server error");
    assert_eq!(app.store.snapshot().await, before);
}

#[tokio::test]
async fn test_checkout_validation() {
    let app = TestApp::new();
    let cast = app.cast().await;

    let (status, body) = app
        .post("/api/v1/checkout", &cast.member, &checkout_body("visa"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_cart");

    let id = product(&app, &cast, "Salt", "1.00", 5).await;
    app.post("/api/v1/cart", &cast.member, &json!({ "product_id": id }))
        .await;

    let (status, _) = app
        .post("/api/v1/checkout", &cast.member, &checkout_body("cash"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/checkout",
            &cast.member,
            &json!({ "shipping_address": "  ", "payment_method": "visa" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/checkout",
            &cast.member,
            &json!({ "shipping_address": "Huye", "payment_method": "visa", "currency": "GBP" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post("/api/v1/checkout", &cast.member, &json!({ "payment_method": "visa" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_cart_line_updates() {
    let app = TestApp::new();
    let cast = app.cast().await;
    let id = product(&app, &cast, "Eggs", "0.50", 30).await;

    app.post("/api/v1/cart", &cast.member, &json!({ "product_id": id, "quantity": 2 }))
        .await;
    let (_, line) = app
        .post("/api/v1/cart", &cast.member, &json!({ "product_id": id, "quantity": 3 }))
        .await;
    assert_eq!(line["quantity"], 5);
    let line_uri = format!("/api/v1/cart/{}", line["id"]);

    let (status, _) = app
        .patch(&line_uri, &cast.creator, &json!({ "quantity": 1 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = app
        .patch(&line_uri, &cast.member, &json!({ "quantity": 12 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["line_total"], "6.00");

    let (status, _) = app
        .patch(&line_uri, &cast.member, &json!({ "quantity": 0 }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&line_uri, &cast.member).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/v1/cart", &cast.outsider, &json!({ "product_id": id }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/v1/cart", &cast.member, &json!({ "product_id": id, "quantity": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dashboard_summary() {
    let app = TestApp::new();
    let cast = app.cast().await;
    let low = product(&app, &cast, "Matches", "0.20", 2).await;
    product(&app, &cast, "Candles", "1.00", 50).await;
    app.create_product(
        &cast.creator,
        &json!({ "name": "Empty Crate", "status": "out_of_stock", "vendor": cast.creator.id }),
    )
    .await;
    app.post("/api/v1/cart", &cast.creator, &json!({ "product_id": low, "quantity": 2 }))
        .await;

    let (status, summary) = app.get("/api/v1/dashboard/summary", &cast.creator).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["products"]["total"], 3);
    assert_eq!(summary["products"]["active"], 2);
    assert_eq!(summary["products"]["low_stock"], 1);
    assert_eq!(summary["products"]["out_of_stock"], 1);
    assert_eq!(summary["cart"]["items_count"], 1);
    assert_eq!(summary["cart"]["total_quantity"], 2);
    assert_eq!(summary["cart"]["total_value"], "0.40");
    assert_eq!(summary["recent_products"].as_array().unwrap().len(), 3);

    // Other users do not see the creator's sold-out product.
    let (_, summary) = app.get("/api/v1/dashboard/summary", &cast.member).await;
    assert_eq!(summary["products"]["total"], 2);

    let (_, summary) = app.get("/api/v1/dashboard/summary", &cast.outsider).await;
    assert_eq!(summary["products"]["total"], 0);
}
