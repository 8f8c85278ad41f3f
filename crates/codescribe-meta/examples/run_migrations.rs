//! Run database migrations for codescribe-meta
//!
//! Usage: cargo run --example `run_migrations`

use codescribe_config::DatabaseConfig;
use codescribe_meta::pool::initialize_database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DatabaseConfig::from_env();

    println!(
        "Setting up database at: {}",
        config.safe_connection_string()
    );

    let pool = initialize_database(&config).await?;

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name FROM information_schema.tables
         WHERE table_schema = 'public'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await?;

    println!("\nCreated tables:");
    for table in tables {
        println!("  - {table}");
    }

    Ok(())
}
