//! Identity extractor.
//!
//! An upstream authentication layer puts the caller's user id in a trusted
//! header (`BIKA_IDENTITY_HEADER`). The extractor loads the matching active
//! account; everything downstream works from its [`Identity`](bika_core::Identity).

use axum::{extract::FromRequestParts, http::request::Parts};

use bika_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::models::Account;
use crate::state::AppState;

/// Extractor that requires a known, active account.
///
/// Rejects with 401 if the header is missing or malformed, or the account is
/// unknown or inactive.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireIdentity(account): RequireIdentity) -> Json<Account> {
///     Json(account)
/// }
/// ```
pub struct RequireIdentity(pub Account);

impl FromRequestParts<AppState> for RequireIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(&state.config().identity_header)
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

        let user_id = raw
            .to_str()
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .ok_or_else(|| AppError::Unauthorized("malformed identity header".to_owned()))?;

        let account = state
            .store()
            .find_account(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown or inactive account".to_owned()))?;

        set_sentry_user(&account.identity.id, Some(&account.username));

        Ok(Self(account))
    }
}
