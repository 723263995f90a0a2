//! CLI subcommands.

pub mod accounts;
pub mod catalog;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use bika_api::db::RepositoryError;
use bika_api::services::ServiceError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A flag value did not parse.
    #[error("Invalid {field}: {value}")]
    InvalidArgument { field: &'static str, value: String },

    #[error("Unit not found: {0}")]
    UnknownUnit(String),

    #[error("Already exists: {0}")]
    Exists(String),
}

/// Connect using `BIKA_DATABASE_URL` or `DATABASE_URL`.
///
/// # Errors
///
/// Returns `CliError::MissingEnvVar` if neither is set.
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("BIKA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("BIKA_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(bika_api::db::create_pool(&SecretString::from(database_url)).await?)
}
