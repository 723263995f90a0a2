//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use bika_core::{CategoryId, CommerceError, ProductId, ProductStatus, UserId};

use crate::error::Result;
use crate::middleware::RequireIdentity;
use crate::models::ProductView;
use crate::services::{CatalogService, ListFilter, ProductInput, StockAdjustment};
use crate::state::AppState;

/// Query parameters for the product listing.
///
/// Everything arrives as text so bad values produce a `validation_error`
/// body instead of a bare query rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    status: Option<String>,
    category: Option<String>,
    vendor: Option<String>,
    mine: Option<String>,
    manage: Option<String>,
}

fn flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn parsed<T: std::str::FromStr>(value: Option<&str>, field: &str) -> Result<Option<T>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| CommerceError::validation(format!("invalid {field}: {raw}")).into()),
    }
}

impl ListParams {
    fn filter(&self) -> Result<ListFilter> {
        Ok(ListFilter {
            status: parsed::<ProductStatus>(self.status.as_deref(), "status")?,
            category_id: parsed::<CategoryId>(self.category.as_deref(), "category")?,
            vendor_id: parsed::<UserId>(self.vendor.as_deref(), "vendor")?,
            mine: flag(self.mine.as_deref()),
            manage: flag(self.manage.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StockDelta {
    pub delta: i32,
}

/// List the products the caller may browse, newest first.
///
/// `?mine=1` lists the caller's own products in every status. `?manage=1`
/// lets admins see every status.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ProductView>>> {
    let filter = params.filter()?;
    let products = CatalogService::new(state.store())
        .list(&account.identity, filter)
        .await?;
    Ok(Json(products.iter().map(ProductView::from).collect()))
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let Json(input) = payload?;
    let product = CatalogService::new(state.store())
        .create(&account.identity, input)
        .await?;
    Ok((StatusCode::CREATED, Json(ProductView::from(&product))))
}

#[instrument(skip_all, fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = CatalogService::new(state.store())
        .detail(&account.identity, id)
        .await?;
    Ok(Json(ProductView::from(&product)))
}

#[instrument(skip_all, fields(product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
    Path(id): Path<ProductId>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<ProductView>> {
    let Json(input) = payload?;
    let product = CatalogService::new(state.store())
        .update(&account.identity, id, input)
        .await?;
    Ok(Json(ProductView::from(&product)))
}

#[instrument(skip_all, fields(product_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>> {
    CatalogService::new(state.store())
        .delete(&account.identity, id)
        .await?;
    Ok(Json(json!({ "detail": "product deleted" })))
}

/// Apply a signed stock delta under the product row lock.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
    Path(id): Path<ProductId>,
    payload: std::result::Result<Json<StockDelta>, JsonRejection>,
) -> Result<Json<StockAdjustment>> {
    let Json(StockDelta { delta }) = payload?;
    let adjustment = CatalogService::new(state.store())
        .adjust_stock(&account.identity, id, delta)
        .await?;
    Ok(Json(adjustment))
}
