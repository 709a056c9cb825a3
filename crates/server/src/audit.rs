//! Audit trail of mutating requests.

use shared_types::{AppError, AuditLog, AuditLogParams, PaginatedResponse};
use sqlx::{Pool, Postgres};

use crate::auth::jwt::Claims;
use crate::pagination::Listing;

/// Append an entry to the audit log.
///
/// Never fails the caller: insert errors are logged and swallowed. Does
/// nothing when the `audit` feature flag is off.
pub async fn record(
    pool: &Pool<Postgres>,
    user_id: Option<i64>,
    action: &str,
    entite: &str,
    entite_id: Option<String>,
    details: Option<serde_json::Value>,
) {
    if !crate::config::feature_flags().audit {
        return;
    }

    let result = sqlx::query(
        r#"
        INSERT INTO audit_logs (user_id, action, entite, entite_id, details)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(action)
    .bind(entite)
    .bind(entite_id.as_deref())
    .bind(details)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(action, entite, entite_id = ?entite_id, error = %e, "Failed to write audit log");
    }
}

/// Shorthand for handlers: record on behalf of the authenticated caller.
pub async fn log(
    pool: &Pool<Postgres>,
    claims: &Claims,
    action: &str,
    entite: &str,
    entite_id: impl ToString,
) {
    record(pool, Some(claims.sub), action, entite, Some(entite_id.to_string()), None).await;
}

/// Same as [`log`] with a JSON payload.
pub async fn log_with(
    pool: &Pool<Postgres>,
    claims: &Claims,
    action: &str,
    entite: &str,
    entite_id: impl ToString,
    details: serde_json::Value,
) {
    record(
        pool,
        Some(claims.sub),
        action,
        entite,
        Some(entite_id.to_string()),
        Some(details),
    )
    .await;
}

/// Paginated audit log, newest first.
pub async fn list(
    pool: &Pool<Postgres>,
    params: &AuditLogParams,
) -> Result<PaginatedResponse<AuditLog>, AppError> {
    Listing::new(
        "audit_logs a LEFT JOIN users u ON u.id = a.user_id",
        "a.id, a.user_id, u.email AS user_email, a.action, a.entite, a.entite_id, \
         a.details, a.created_at",
    )
    .eq("a.entite", params.entite.clone())
    .eq("a.user_id", params.user_id)
    .eq("a.action", params.action.clone())
    .gte("a.created_at::date", params.du)
    .lte("a.created_at::date", params.au)
    .order_by("a.created_at DESC, a.id DESC")
    .fetch_page(pool, params.page, params.limit)
    .await
}
