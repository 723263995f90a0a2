//! Database operations for cart lines.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use bika_core::{CartLineId, ProductId, UserId};

use super::{RepositoryError, Result};
use super::products::{PRODUCT_SELECT, ProductRow};
use crate::models::{CartEntry, CartLine, Product};

const CART_COLUMNS: &str = "id, user_id, product_id, quantity, added_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct CartLineRow {
    id: i64,
    user_id: i64,
    product_id: i64,
    quantity: i32,
    added_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: CartLineId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
            added_at: row.added_at,
            updated_at: row.updated_at,
        }
    }
}

pub(super) async fn lock_cart<'e>(
    executor: impl PgExecutor<'e>,
    user_id: UserId,
) -> Result<Vec<CartLine>> {
    let sql = format!(
        "SELECT {CART_COLUMNS} FROM bika.cart_line WHERE user_id = $1 ORDER BY added_at, id FOR UPDATE"
    );
    let rows = sqlx::query_as::<_, CartLineRow>(&sql)
        .bind(user_id.as_i64())
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(CartLine::from).collect())
}

pub(super) async fn delete_lines<'e>(
    executor: impl PgExecutor<'e>,
    user_id: UserId,
    ids: &[CartLineId],
) -> Result<u64> {
    let ids: Vec<i64> = ids.iter().map(CartLineId::as_i64).collect();
    let result = sqlx::query("DELETE FROM bika.cart_line WHERE user_id = $1 AND id = ANY($2)")
        .bind(user_id.as_i64())
        .bind(ids)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Cart lines with their products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn entries(&self, user_id: UserId) -> Result<Vec<CartEntry>> {
        let sql = format!(
            "SELECT {CART_COLUMNS} FROM bika.cart_line WHERE user_id = $1 ORDER BY added_at DESC, id DESC"
        );
        let lines: Vec<CartLine> = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(user_id.as_i64())
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(CartLine::from)
            .collect();

        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        qb.push(" WHERE p.id = ANY(");
        qb.push_bind(lines.iter().map(|l| l.product_id.as_i64()).collect::<Vec<_>>());
        qb.push(")");
        let products: Vec<Product> = qb
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(Product::from)
            .collect();

        // Lines whose product vanished in between are cascaded away; skip them.
        Ok(lines
            .into_iter()
            .filter_map(|line| {
                products
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .cloned()
                    .map(|product| CartEntry { line, product })
            })
            .collect())
    }

    /// Insert a line, or add to the quantity of the existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product was deleted
    /// concurrently, `RepositoryError::OutOfRange` if the summed quantity
    /// overflows the column.
    pub async fn add(&self, user_id: UserId, product_id: ProductId, quantity: i32) -> Result<CartLine> {
        let sql = format!(
            r"
            INSERT INTO bika.cart_line (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = bika.cart_line.quantity + EXCLUDED.quantity,
                          updated_at = now()
            RETURNING {CART_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(user_id.as_i64())
            .bind(product_id.as_i64())
            .bind(quantity)
            .fetch_one(self.pool)
            .await
            .map_err(RepositoryError::from_write)?;
        Ok(CartLine::from(row))
    }

    /// Overwrite the quantity of one of the user's lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<Option<CartLine>> {
        let sql = format!(
            r"
            UPDATE bika.cart_line SET quantity = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {CART_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(line_id.as_i64())
            .bind(user_id.as_i64())
            .bind(quantity)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(CartLine::from))
    }

    /// Delete one of the user's lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(&self, user_id: UserId, line_id: CartLineId) -> Result<bool> {
        let removed = delete_lines(self.pool, user_id, &[line_id]).await?;
        Ok(removed > 0)
    }
}
