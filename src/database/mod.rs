use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::CoreResult;

pub mod models;
pub mod queries;

/// Open a pool against `database_url` and bring the schema up to date.
///
/// An in-memory database exists per connection, so those get a single
/// connection; file-backed databases get a small pool.
pub async fn init_pool(database_url: &str) -> CoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let max_connections = if database_url.contains(":memory:") {
        1
    } else {
        5
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    tracing::debug!("running database migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(sqlx::Error::from)?;

    Ok(pool)
}

/// The schema ships with a partial unique index that limits a user to one
/// active attempt per exam. When concurrent attempts are enabled, the index
/// is dropped so the constraint does not apply.
pub async fn apply_attempt_policy(pool: &SqlitePool, allow_concurrent: bool) -> CoreResult<()> {
    if allow_concurrent {
        sqlx::query("DROP INDEX IF EXISTS idx_mock_exam_attempts_active")
            .execute(pool)
            .await?;
        tracing::info!("concurrent exam attempts enabled");
    }
    Ok(())
}
