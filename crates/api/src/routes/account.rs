//! The caller's own account.

use axum::Json;
use tracing::instrument;

use crate::middleware::RequireIdentity;
use crate::models::Account;

/// Return the resolved account for the identity header.
#[instrument(skip_all)]
pub async fn me(RequireIdentity(account): RequireIdentity) -> Json<Account> {
    Json(account)
}
