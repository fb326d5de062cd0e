//! Postgres connection pool.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::DbError;

/// Type alias for the shared Postgres pool used across the whole application.
pub type DbPool = PgPool;

/// Create a new connection pool from the given `database_url`.
///
/// Pool shape: at most 25 connections, at least 5 kept live, connections
/// recycled after 5 minutes, acquisition bounded at 10 seconds.
pub async fn create_pool(database_url: &str) -> Result<DbPool, DbError> {
    info!("connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(25)
        .min_connections(5)
        .max_lifetime(Duration::from_secs(5 * 60))
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply the migrations embedded from the workspace `migrations/`
/// directory; today that is just the `dags` definitions table.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    info!("applying dag store migrations");
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}
