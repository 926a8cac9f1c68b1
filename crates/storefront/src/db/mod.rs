//! Direct `PostgreSQL` access for the storefront catalog.
//!
//! Used when `STOREFRONT_DATABASE_URL` is set; otherwise the storefront talks
//! to the hosted REST interface and never opens a pool.
//!
//! ## Tables
//!
//! - `regions`, `countries` - Region resolution and currency/tax context
//! - `products`, `product_variants`, `prices` - Catalog with nested variants
//! - `product_options`, `product_option_values` - Variant option axes
//! - `carts`, `line_items` - Shopping carts
//! - Plain catalog tables addressed generically by the store adapter
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p kruuse-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the embedded catalog migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
