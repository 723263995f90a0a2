//! Order history for the caller.

use tracing::instrument;

use bika_core::{CommerceError, Identity, OrderId};

use super::Result;
use crate::db::Store;
use crate::models::{OrderDetail, OrderSummary};

pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn list(&self, identity: &Identity) -> Result<Vec<OrderSummary>> {
        Ok(self.store.orders_for_user(identity.id).await?)
    }

    /// # Errors
    ///
    /// `NotFound` unless the order belongs to the caller.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn detail(&self, identity: &Identity, id: OrderId) -> Result<OrderDetail> {
        let detail = self
            .store
            .order_detail(identity.id, id)
            .await?
            .ok_or(CommerceError::NotFound)?;
        Ok(detail)
    }
}
