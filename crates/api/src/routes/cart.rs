//! Cart route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use bika_core::{CartLineId, ProductId};

use crate::error::Result;
use crate::middleware::RequireIdentity;
use crate::services::{CartService, CartView, CartViewLine};
use crate::state::AppState;

const fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantity {
    pub quantity: i32,
}

#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.store()).view(&account.identity).await?;
    Ok(Json(cart))
}

#[instrument(skip_all)]
pub async fn add(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
    payload: std::result::Result<Json<AddToCart>, JsonRejection>,
) -> Result<Json<CartViewLine>> {
    let Json(body) = payload?;
    let line = CartService::new(state.store())
        .add(&account.identity, body.product_id, body.quantity)
        .await?;
    Ok(Json(line))
}

/// Set a line's quantity; zero or less removes it (204).
#[instrument(skip_all, fields(line_id = %line_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
    Path(line_id): Path<CartLineId>,
    payload: std::result::Result<Json<SetQuantity>, JsonRejection>,
) -> Result<Response> {
    let Json(body) = payload?;
    let line = CartService::new(state.store())
        .update(&account.identity, line_id, body.quantity)
        .await?;
    Ok(match line {
        Some(line) => Json(line).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

#[instrument(skip_all, fields(line_id = %line_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
    Path(line_id): Path<CartLineId>,
) -> Result<StatusCode> {
    CartService::new(state.store())
        .remove(&account.identity, line_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
