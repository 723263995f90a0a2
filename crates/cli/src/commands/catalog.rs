//! Category bootstrap.

use sqlx::PgPool;

use bika_api::db::PgStore;
use bika_api::services::CatalogService;

use super::CliError;

/// Create a category with a generated slug, or report the existing one.
///
/// # Errors
///
/// Returns `CliError::Service` if the store fails.
pub async fn create_category(pool: PgPool, name: &str) -> Result<(), CliError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidArgument {
            field: "name",
            value: name.to_owned(),
        });
    }

    let store = PgStore::new(pool);
    let category = CatalogService::new(&store).ensure_category(name).await?;
    tracing::info!(
        "Category ready! ID: {}, Name: {}, Slug: {}",
        category.id,
        category.name,
        category.slug
    );
    Ok(())
}
