// src/db.rs
use crate::{config::DatabaseConfig, error::AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Opens the SQLite pool and brings the schema up to date.
///
/// The caller owns the returned pool and is expected to `close()` it on shutdown.
pub async fn create_db_pool(config: &DatabaseConfig) -> AppResult<SqlitePool> {
    tracing::info!("Connecting to database: {}", config.url);

    // Create the file if needed; cascades depend on foreign keys being enforced
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations complete.");

    Ok(pool)
}

/// SQLite reports constraint failures with extended codes; this picks out UNIQUE ones.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
