//! CLI command implementations.

pub mod check_env;
pub mod migrate;
pub mod seed;
pub mod store;

use kruuse_storefront::backend::{Backend, PgStore, PostgrestStore};
use kruuse_storefront::config::StorefrontConfig;
use kruuse_storefront::db;

/// Load the storefront configuration and connect to its data store.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the store can't be reached.
pub async fn connect() -> Result<(StorefrontConfig, Backend), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;

    let backend = match &config.database_url {
        Some(database_url) => Backend::Postgres(PgStore::new(db::create_pool(database_url).await?)),
        None => Backend::Postgrest(PostgrestStore::new(&config.supabase)?),
    };

    tracing::info!(backend = backend.kind(), "Connected to data store");
    Ok((config, backend))
}
