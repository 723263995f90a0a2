//! Checkout route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireIdentity;
use crate::services::{CheckoutReceipt, CheckoutRequest, CheckoutService, Preview};
use crate::state::AppState;

fn service(state: &AppState) -> CheckoutService<'_> {
    CheckoutService::new(state.store(), state.gateway(), state.config().checkout)
}

/// Price the cart at current prices. Nothing is reserved.
#[instrument(skip_all)]
pub async fn preview(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
) -> Result<Json<Preview>> {
    let preview = service(&state).preview(&account.identity).await?;
    Ok(Json(preview))
}

/// Place an order for everything in the cart.
///
/// All or nothing: on any error the cart, stock, orders and payments are
/// exactly as they were before the request.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckoutReceipt>)> {
    let Json(request) = payload?;
    add_breadcrumb(
        "checkout",
        "Checkout submitted",
        Some(&[("payment_method", request.payment_method.as_str())]),
    );

    let receipt = service(&state).checkout(&account.identity, &request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
