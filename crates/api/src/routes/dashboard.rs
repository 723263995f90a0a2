//! Dashboard route handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireIdentity;
use crate::services::{DashboardService, DashboardSummary};
use crate::state::AppState;

/// Product counts, cart totals and recently added products.
#[instrument(skip_all)]
pub async fn summary(
    State(state): State<AppState>,
    RequireIdentity(account): RequireIdentity,
) -> Result<Json<DashboardSummary>> {
    let summary = DashboardService::new(state.store())
        .summary(&account.identity)
        .await?;
    Ok(Json(summary))
}
