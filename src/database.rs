use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub type Database = SqlitePool;

/// Open a pooled connection to the document store at `database_url`.
///
/// The file is created when it does not exist yet.
pub async fn create_database_connection(
    database_url: &str,
    max_connections: u32,
) -> Result<Database, sqlx::Error> {
    if database_url.contains(":memory:") {
        tracing::warn!("Using an in-memory database; data is lost on shutdown");
        return connect_in_memory().await;
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    tracing::info!("Database connected successfully");
    Ok(pool)
}

/// Private in-memory store, dropped together with the pool.
///
/// Every SQLite connection to `:memory:` opens its own database, so the pool is
/// pinned to a single connection that never expires.
pub async fn connect_in_memory() -> Result<Database, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &Database) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Migrations executed successfully");
    Ok(())
}

pub async fn close(pool: Database) {
    pool.close().await;
    tracing::info!("Database connection closed");
}
