//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! kruuse migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Catalog migrations live in `crates/storefront/migrations/` and are
//! embedded into the storefront crate at compile time.

use secrecy::SecretString;
use thiserror::Error;
use tracing::info;

use kruuse_storefront::db;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: STOREFRONT_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

fn database_url() -> Result<SecretString, MigrationError> {
    ["STOREFRONT_DATABASE_URL", "DATABASE_URL"]
        .into_iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty())
        .map(SecretString::from)
        .ok_or(MigrationError::MissingDatabaseUrl)
}

/// Run the storefront catalog migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the connection fails, or a
/// migration fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();
    let database_url = database_url()?;

    info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running storefront migrations...");
    db::run_migrations(&pool).await?;

    info!("Storefront migrations complete!");
    Ok(())
}
