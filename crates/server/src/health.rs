use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::{Pool, Postgres};

use crate::config::{cabinet, feature_flags};
use crate::search::get_search;

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

pub fn record_start_time() {
    STARTED_AT.get_or_init(Instant::now);
}

fn uptime_seconds() -> u64 {
    STARTED_AT.get().map_or(0, |t| t.elapsed().as_secs())
}

/// Liveness report. `status` turns `degraded` when PostgreSQL does not answer;
/// the process itself stays up so the load balancer can tell the two apart.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub db: String,
    /// `ready`, `disabled`, or `unavailable` when the flag is on but the index failed to open.
    pub search: String,
    pub cabinet: String,
    pub uptime_seconds: u64,
    pub version: String,
}

fn search_state(enabled: bool, ready: bool) -> &'static str {
    match (enabled, ready) {
        (false, _) => "disabled",
        (true, true) => "ready",
        (true, false) => "unavailable",
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Process is up; see `status` for dependencies", body = HealthResponse)
    ),
    tag = "health"
)]
#[tracing::instrument(skip(pool))]
pub async fn health_check(State(pool): State<Pool<Postgres>>) -> Json<HealthResponse> {
    let ping = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&pool).await;
    let (status, db) = match ping {
        Ok(_) => ("ok", "connected".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the database");
            ("degraded", format!("error: {e}"))
        }
    };

    Json(HealthResponse {
        status: status.into(),
        db,
        search: search_state(feature_flags().search, get_search().is_some()).into(),
        cabinet: cabinet().nom.clone(),
        uptime_seconds: uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_state_reflects_flag_and_index() {
        assert_eq!(search_state(false, true), "disabled");
        assert_eq!(search_state(true, true), "ready");
        assert_eq!(search_state(true, false), "unavailable");
    }
}
