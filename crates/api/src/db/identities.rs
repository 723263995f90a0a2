//! Database operations for accounts.
//!
//! Accounts are provisioned out of band (see `bika-cli user create`); the API
//! only reads them to build the caller's identity.

use sqlx::PgPool;

use bika_core::{Identity, Role, UnitId, UserId, UserType};

use super::{RepositoryError, Result};
use crate::models::{Account, NewAccount};

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    email: Option<String>,
    is_superuser: bool,
    role: Role,
    user_type: UserType,
    unit_id: Option<i64>,
    unit_name: Option<String>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            identity: Identity {
                id: UserId::new(row.id),
                is_superuser: row.is_superuser,
                role: row.role,
                user_type: row.user_type,
                unit_id: row.unit_id.map(UnitId::new),
            },
            username: row.username,
            email: row.email,
            unit: row.unit_name,
        }
    }
}

/// Repository for account lookups.
pub struct IdentityRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> IdentityRepository<'a> {
    /// Create a new identity repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// An active account by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_active(&self, id: UserId) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r"
            SELECT a.id, a.username, a.email, a.is_superuser, a.role, a.user_type,
                   a.unit_id, u.name AS unit_name
            FROM bika.user_account a
            LEFT JOIN bika.unit u ON u.id = a.unit_id
            WHERE a.id = $1 AND a.is_active
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    /// The active vendor account with the lowest ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn first_active_vendor(&self) -> Result<Option<UserId>> {
        let id = sqlx::query_scalar::<_, i64>(
            r"
            SELECT id FROM bika.user_account
            WHERE user_type = 'vendor' AND is_active
            ORDER BY id
            LIMIT 1
            ",
        )
        .fetch_optional(self.pool)
        .await?;
        Ok(id.map(UserId::new))
    }

    /// Create a unit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate name or code.
    pub async fn insert_unit(&self, name: &str, code: Option<&str>) -> Result<UnitId> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO bika.unit (name, code) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(code)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;
        Ok(UnitId::new(id))
    }

    /// A unit's ID by exact name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unit_by_name(&self, name: &str) -> Result<Option<UnitId>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM bika.unit WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;
        Ok(id.map(UnitId::new))
    }

    /// Provision an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate username and
    /// `RepositoryError::NotFound` for an unknown unit.
    pub async fn insert_account(&self, account: &NewAccount) -> Result<UserId> {
        let id = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO bika.user_account
                (username, email, is_superuser, is_active, role, user_type, unit_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(&account.username)
        .bind(account.email.as_deref())
        .bind(account.is_superuser)
        .bind(account.is_active)
        .bind(account.role)
        .bind(account.user_type)
        .bind(account.unit_id.map(|u| u.as_i64()))
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;
        Ok(UserId::new(id))
    }
}
