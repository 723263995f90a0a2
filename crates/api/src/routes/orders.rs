//! Order history route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use bika_core::OrderId;

use crate::error::Result;
use crate::middleware::RequireIdentity;
use crate::models::{OrderDetail, OrderSummary};
use crate::services::OrderService;
use crate::state::AppState;

#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
) -> Result<Json<Vec<OrderSummary>>> {
    let orders = OrderService::new(state.store()).list(&account.identity).await?;
    Ok(Json(orders))
}

/// Order with its items and payments. Other users' orders are 404.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let detail = OrderService::new(state.store())
        .detail(&account.identity, id)
        .await?;
    Ok(Json(detail))
}
