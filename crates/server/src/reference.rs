use chrono::Utc;
use shared_types::{format_reference, AppError, ReferenceKind};
use sqlx::{PgConnection, Postgres, Transaction};

use crate::error_convert::SqlxErrorExt;

/// Reserve the next sequence number for `(prefix, scope)`.
///
/// The upsert takes a row lock on the counter, so concurrent callers are
/// serialized and never see the same value.
pub async fn next_value(conn: &mut PgConnection, prefix: &str, scope: &str) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO reference_counters (prefix, scope, last_value)
        VALUES ($1, $2, 1)
        ON CONFLICT (prefix, scope)
        DO UPDATE SET last_value = reference_counters.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(prefix)
    .bind(scope)
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Generate the next reference for `kind`, e.g. `AFF-2025-0007` or `IMM-012`.
///
/// Must run inside the transaction that inserts the record, so a rollback
/// also releases the number.
pub async fn next_reference(
    tx: &mut Transaction<'_, Postgres>,
    kind: ReferenceKind,
) -> Result<String, AppError> {
    let scope = kind.scope_for(Utc::now().date_naive());
    let seq = next_value(&mut **tx, kind.prefix(), &scope).await?;
    Ok(format_reference(kind.prefix(), Some(&scope), seq, kind.width()))
}
