//! HTTP route handlers.
//!
//! Everything except the health probes lives under `/api/v1` and requires an
//! identity.
//!
//! # Routes
//!
//! | Method | Path                         | Handler                |
//! |--------|------------------------------|------------------------|
//! | GET    | /me                          | `account::me`          |
//! | GET    | /dashboard/summary           | `dashboard::summary`   |
//! | GET    | /products                    | `products::index`      |
//! | POST   | /products                    | `products::create`     |
//! | GET    | /products/{id}               | `products::show`       |
//! | PATCH  | /products/{id}               | `products::update`     |
//! | DELETE | /products/{id}               | `products::destroy`    |
//! | PATCH  | /products/{id}/stock         | `products::adjust_stock` |
//! | GET    | /cart                        | `cart::show`           |
//! | POST   | /cart                        | `cart::add`            |
//! | PATCH  | /cart/{line_id}              | `cart::update`         |
//! | DELETE | /cart/{line_id}              | `cart::remove`         |
//! | GET    | /checkout/preview            | `checkout::preview`    |
//! | POST   | /checkout                    | `checkout::submit`     |
//! | GET    | /orders                      | `orders::index`        |
//! | GET    | /orders/{id}                 | `orders::show`         |

pub mod account;
pub mod cart;
pub mod checkout;
pub mod dashboard;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};

use crate::state::AppState;

/// Health check endpoint (liveness probe).
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness check endpoint (readiness probe).
///
/// Returns 503 while the store is unreachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::destroy),
        )
        .route("/{id}/stock", patch(products::adjust_stock))
}

fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add))
        .route("/{line_id}", patch(cart::update).delete(cart::remove))
}

fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::submit))
        .route("/preview", get(checkout::preview))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// All `/api/v1` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(account::me))
        .route("/dashboard/summary", get(dashboard::summary))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
}
