//! Pool construction and migration bootstrap

use codescribe_config::DatabaseConfig;
use sqlx::PgPool;

/// Build a connection pool from `config` without running migrations.
///
/// # Errors
/// Returns an error if the pool cannot connect.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    config.create_pool().await
}

/// Build a connection pool and run embedded migrations against it.
///
/// # Errors
/// Returns an error if the pool cannot connect or a migration fails.
pub async fn initialize_database(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = create_pool(config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
