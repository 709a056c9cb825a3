use axum::extract::FromRef;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::config::env_or;

/// Shared application state passed to Axum handlers via `State`.
/// Derives `FromRef` so handlers can extract `State<PgPool>` directly.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: Pool<Postgres>,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Create the connection pool for `database_url`.
/// Uses `connect_lazy` so no connections open until the first query.
pub fn create_pool(database_url: &str) -> Result<Pool<Postgres>, sqlx::Error> {
    let max_connections: u32 = env_or("DATABASE_MAX_CONNECTIONS", 10);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_lazy(database_url)
}

/// Create the pool from the `DATABASE_URL` environment variable.
pub fn create_pool_from_env() -> Result<Pool<Postgres>, String> {
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;
    create_pool(&database_url).map_err(|e| format!("Failed to create database pool: {e}"))
}

/// Run embedded database migrations against the given pool.
pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
