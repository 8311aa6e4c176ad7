use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::error::OptimizeError;

/// Opens the SQLite pool and makes sure the cache tables exist.
pub async fn db_connection(database_url: &str) -> Result<SqlitePool, OptimizeError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    // every connection to `sqlite::memory:` is its own database
    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new().connect_with(options).await?
    };
    info!("Connected to SQLite database at {database_url}");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS geocode_cache (
            address TEXT PRIMARY KEY,
            lat REAL NOT NULL,
            lng REAL NOT NULL,
            cached_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}
