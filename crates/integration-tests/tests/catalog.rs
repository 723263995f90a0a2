//! Catalog visibility, product CRUD and stock adjustment over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};
use tokio::task::JoinSet;

use bika_integration_tests::TestApp;

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_unit_visibility_follows_creator_unit() {
    let app = TestApp::new();
    let cast = app.cast().await;

    let shared = app
        .create_product(
            &cast.creator,
            &json!({ "name": "Maize Flour", "price": "1200.00", "stock_quantity": 40, "vendor": cast.creator.id }),
        )
        .await;
    let private = app
        .create_product(
            &cast.creator,
            &json!({ "name": "Draft Notes", "visibility": "private", "vendor": cast.creator.id }),
        )
        .await;

    let (status, list) = app.get("/api/v1/products", &cast.member).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&list), vec![shared]);

    let (_, list) = app.get("/api/v1/products", &cast.outsider).await;
    assert!(ids(&list).is_empty());

    let (_, list) = app.get("/api/v1/products", &cast.admin).await;
    assert_eq!(ids(&list), vec![private, shared]);

    let (status, body) = app
        .get(&format!("/api/v1/products/{shared}"), &cast.outsider)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = app
        .get(&format!("/api/v1/products/{private}"), &cast.member)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_fills_defaults() {
    let app = TestApp::new();
    let cast = app.cast().await;

    let (status, first) = app
        .post("/api/v1/products", &cast.creator, &json!({ "name": "Green Tea" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["slug"], "green-tea");
    assert_eq!(first["sku"], "SKU1001");
    assert_eq!(first["status"], "active");
    assert_eq!(first["active"], true);
    assert_eq!(first["visibility"], "unit");
    assert_eq!(first["track_inventory"], true);
    assert_eq!(first["stock_quantity"], 0);
    assert_eq!(first["low_stock_threshold"], 5);
    assert_eq!(first["category_name"], "General");
    // The only active vendor account becomes the vendor.
    assert_eq!(first["vendor"], json!(cast.vendor.id));
    assert!(first["published_at"].is_string());

    let (_, second) = app
        .post(
            "/api/v1/products",
            &cast.creator,
            &json!({ "name": "Green Tea", "active": false, "category": "Beverages" }),
        )
        .await;
    assert_eq!(second["slug"], "green-tea-2");
    assert_eq!(second["sku"], "SKU1002");
    assert_eq!(second["status"], "draft");
    assert_eq!(second["category_name"], "Beverages");
    assert!(second["published_at"].is_null());

    let (_, own) = app
        .post("/api/v1/products", &cast.vendor, &json!({ "name": "Sorghum" }))
        .await;
    assert_eq!(own["vendor"], json!(cast.vendor.id));
}

#[tokio::test]
async fn test_create_validation() {
    let app = TestApp::new();
    let cast = app.cast().await;

    let (status, body) = app
        .post("/api/v1/products", &cast.creator, &json!({ "price": "5.00" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = app
        .post(
            "/api/v1/products",
            &cast.creator,
            &json!({ "name": "Beans", "price": "-1.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/products",
            &cast.creator,
            &json!({ "name": "Beans", "stock_quantity": -3 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/products",
            &cast.creator,
            &json!({ "name": "Beans", "vendor": 9999 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_and_delete_require_creator_or_admin() {
    let app = TestApp::new();
    let cast = app.cast().await;
    let id = app
        .create_product(
            &cast.creator,
            &json!({ "name": "Honey", "price": "8.00", "vendor": cast.creator.id }),
        )
        .await;
    let uri = format!("/api/v1/products/{id}");

    let (status, body) = app
        .patch(&uri, &cast.member, &json!({ "price": "9.00" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission_denied");

    let (status, _) = app
        .patch(&uri, &cast.outsider, &json!({ "price": "9.00" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .patch(&uri, &cast.creator, &json!({ "price": "9.50", "compare_price": "12.00" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], "9.50");
    assert_eq!(body["slug"], "honey");
    assert_eq!(body["compare_price"], "12.00");

    let (status, body) = app
        .patch(&uri, &cast.creator, &json!({ "compare_price": null }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["compare_price"].is_null());

    let (status, body) = app
        .patch(&uri, &cast.creator, &json!({ "price": "10000000000" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = app.delete(&uri, &cast.member).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, &cast.admin).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, &cast.creator).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_drafts_are_hidden_from_browsers() {
    let app = TestApp::new();
    let cast = app.cast().await;
    let draft = app
        .create_product(
            &cast.creator,
            &json!({ "name": "Prototype", "status": "draft", "vendor": cast.creator.id }),
        )
        .await;

    let (_, list) = app.get("/api/v1/products", &cast.member).await;
    assert!(ids(&list).is_empty());

    let (_, list) = app.get("/api/v1/products?mine=1", &cast.creator).await;
    assert_eq!(ids(&list), vec![draft]);

    let (_, list) = app
        .get("/api/v1/products?manage=true&status=draft", &cast.admin)
        .await;
    assert_eq!(ids(&list), vec![draft]);

    let (status, _) = app
        .get(&format!("/api/v1/products/{draft}"), &cast.member)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .get("/api/v1/products?status=bogus", &cast.member)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_stock_adjustment() {
    let app = TestApp::new();
    let cast = app.cast().await;
    let id = app
        .create_product(
            &cast.creator,
            &json!({ "name": "Rice", "stock_quantity": 3, "vendor": cast.vendor.id }),
        )
        .await;
    let uri = format!("/api/v1/products/{id}/stock");

    let (status, body) = app.patch(&uri, &cast.creator, &json!({ "delta": -2 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock_quantity"], 1);
    assert_eq!(body["is_in_stock"], true);

    // The owning vendor may adjust stock but not edit the product.
    let (status, body) = app.patch(&uri, &cast.vendor, &json!({ "delta": 4 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock_quantity"], 5);
    let (status, _) = app
        .patch(&format!("/api/v1/products/{id}"), &cast.vendor, &json!({ "name": "Rice 2" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.patch(&uri, &cast.member, &json!({ "delta": 1 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.patch(&uri, &cast.creator, &json!({ "delta": -6 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["available"], 5);

    let (status, _) = app.patch(&uri, &cast.creator, &json!({ "delta": "lots" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_decrements_never_oversell() {
    let app = TestApp::new();
    let cast = app.cast().await;
    let id = app
        .create_product(
            &cast.creator,
            &json!({ "name": "Lanterns", "stock_quantity": 10, "vendor": cast.creator.id }),
        )
        .await;
    let mut set = JoinSet::new();
    for _ in 0..25 {
        let app = app.clone();
        let caller = cast.creator.clone();
        set.spawn(async move {
            app.patch(
                &format!("/api/v1/products/{id}/stock"),
                &caller,
                &json!({ "delta": -1 }),
            )
            .await
        });
    }
    let results = set.join_all().await;

    let ok = results.iter().filter(|(s, _)| *s == StatusCode::OK).count();
    let rejected = results
        .iter()
        .filter(|(s, _)| *s == StatusCode::CONFLICT)
        .count();
    assert_eq!(ok, 10);
    assert_eq!(rejected, 15);

    let (_, product) = app.get(&format!("/api/v1/products/{id}"), &cast.creator).await;
    assert_eq!(product["stock_quantity"], 0);
    assert_eq!(product["is_in_stock"], false);
}
