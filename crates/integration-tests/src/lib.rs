//! Integration tests for Bika.
//!
//! The full router from `bika_api::app` is driven in-process with
//! `tower::ServiceExt::oneshot` over the in-memory store, so no database or
//! running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bika-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog` - Visibility, product CRUD and stock adjustment over HTTP
//! - `checkout` - Cart, checkout, orders and failure rollback
//! - `surface` - Health probes, identity header, request IDs, error bodies

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use serde_json::Value;
use tower::ServiceExt;

use bika_api::config::DEFAULT_IDENTITY_HEADER;
use bika_api::db::MemoryStore;
use bika_api::models::NewAccount;
use bika_api::services::{OfflineSettlement, PaymentGateway};
use bika_api::{ApiConfig, AppState};
use bika_core::{Identity, Role, UnitId, UserType};

/// Router plus a handle on the store behind it. Clones share both.
#[derive(Clone)]
pub struct TestApp {
    pub store: MemoryStore,
    router: Router,
}

/// The usual cast: an admin, two members of one unit, an outsider and a vendor.
pub struct Cast {
    pub unit: UnitId,
    pub admin: Identity,
    pub creator: Identity,
    pub member: Identity,
    pub outsider: Identity,
    pub vendor: Identity,
}

impl TestApp {
    /// App settling payments offline.
    pub fn new() -> Self {
        Self::with_gateway(Arc::new(OfflineSettlement))
    }

    pub fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        let store = MemoryStore::new();
        let state = AppState::new(ApiConfig::for_tests(), Arc::new(store.clone()), gateway);
        Self {
            router: bika_api::app(state),
            store,
        }
    }

    pub async fn cast(&self) -> Cast {
        let unit = self.store.add_unit("Kigali North").await;
        let other = self.store.add_unit("Musanze").await;
        Cast {
            unit,
            admin: self
                .store
                .add_account(NewAccount::new("amani").role(Role::Admin))
                .await,
            creator: self.store.add_account(NewAccount::new("beatrice").unit(unit)).await,
            member: self.store.add_account(NewAccount::new("claude").unit(unit)).await,
            outsider: self.store.add_account(NewAccount::new("diane").unit(other)).await,
            vendor: self
                .store
                .add_account(
                    NewAccount::new("eric")
                        .user_type(UserType::Vendor)
                        .unit(other),
                )
                .await,
        }
    }

    /// Send a prebuilt request.
    pub async fn raw(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send a request, optionally as `caller` and with a JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: Option<&Identity>,
        body: Option<&Value>,
    ) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            request = request.header(DEFAULT_IDENTITY_HEADER, caller.id.to_string());
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.raw(request.body(body).unwrap()).await
    }

    /// Send and decode the JSON response. Empty bodies decode as `Null`.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        caller: &Identity,
        body: Option<&Value>,
    ) -> (StatusCode, Value) {
        read_json(self.send(method, uri, Some(caller), body).await).await
    }

    pub async fn get(&self, uri: &str, caller: &Identity) -> (StatusCode, Value) {
        self.call(Method::GET, uri, caller, None).await
    }

    pub async fn post(&self, uri: &str, caller: &Identity, body: &Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, caller, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, caller: &Identity, body: &Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, caller, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, caller: &Identity) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, caller, None).await
    }

    /// Create a product through the API and return its ID.
    pub async fn create_product(&self, caller: &Identity, body: &Value) -> i64 {
        let (status, product) = self.post("/api/v1/products", caller, body).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {product}");
        product["id"].as_i64().unwrap()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
