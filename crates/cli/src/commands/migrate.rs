//! Database migration command.
//!
//! Migrations live in `crates/api/migrations/` and are embedded at compile
//! time. The API never runs them on startup.

use sqlx::PgPool;

use super::CliError;

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `CliError::Migration` if a migration fails.
pub async fn run(pool: &PgPool) -> Result<(), CliError> {
    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(pool).await?;
    tracing::info!("Migrations complete!");
    Ok(())
}
