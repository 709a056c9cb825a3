use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Actions written to the audit log.
pub const AUDIT_ACTIONS: &[&str] = &[
    "create", "update", "delete", "status", "payment", "import", "login",
];

/// One row of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct AuditLog {
    pub id: i64,
    pub user_id: Option<i64>,
    /// Email of the author, when the account still exists.
    pub user_email: Option<String>,
    pub action: String,
    pub entite: String,
    pub entite_id: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AuditLogParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub entite: Option<String>,
    pub user_id: Option<i64>,
    pub action: Option<String>,
    pub du: Option<NaiveDate>,
    pub au: Option<NaiveDate>,
}
