use chrono::{DateTime, Utc};
use shared_types::{
    AppError, CreateUserRequest, PaginatedResponse, UpdateUserRequest, User, UserListParams,
};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;
use crate::pagination::Listing;

const COLUMNS: &str = "id, email, nom, prenom, role, actif, created_at, updated_at";

/// A user row together with its password hash, for credential checks only.
#[derive(Debug, sqlx::FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

pub async fn count(pool: &Pool<Postgres>) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Insert a user. `password_hash` must already be an argon2 PHC string.
pub async fn create(
    pool: &Pool<Postgres>,
    req: &CreateUserRequest,
    password_hash: &str,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, nom, prenom, role)
        VALUES (LOWER($1), $2, $3, $4, COALESCE($5, 'lecteur'))
        RETURNING id, email, nom, prenom, role, actif, created_at, updated_at
        "#,
    )
    .bind(req.email.trim())
    .bind(password_hash)
    .bind(req.nom.trim())
    .bind(req.prenom.trim())
    .bind(req.role.as_deref())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: i64) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, nom, prenom, role, actif, created_at, updated_at
        FROM users WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Look up credentials by email (case-insensitive).
pub async fn find_credentials_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<UserCredentials>, AppError> {
    sqlx::query_as::<_, UserCredentials>(
        r#"
        SELECT id, email, nom, prenom, role, actif, created_at, updated_at, password_hash
        FROM users WHERE email = LOWER($1)
        "#,
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_credentials_by_id(
    pool: &Pool<Postgres>,
    id: i64,
) -> Result<Option<UserCredentials>, AppError> {
    sqlx::query_as::<_, UserCredentials>(
        r#"
        SELECT id, email, nom, prenom, role, actif, created_at, updated_at, password_hash
        FROM users WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list(
    pool: &Pool<Postgres>,
    params: &UserListParams,
) -> Result<PaginatedResponse<User>, AppError> {
    Listing::new("users", COLUMNS)
        .search(&["email", "nom", "prenom"], params.q.as_deref())
        .eq("role", params.role.clone())
        .eq("actif", params.actif)
        .order_by("nom ASC, prenom ASC, id ASC")
        .fetch_page(pool, params.page, params.limit)
        .await
}

/// Update profile fields. Only non-None fields are changed.
pub async fn update(
    pool: &Pool<Postgres>,
    id: i64,
    req: &UpdateUserRequest,
) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            email = COALESCE(LOWER($2), email),
            nom = COALESCE($3, nom),
            prenom = COALESCE($4, prenom),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, email, nom, prenom, role, actif, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(req.email.as_deref().map(str::trim))
    .bind(req.nom.as_deref().map(str::trim))
    .bind(req.prenom.as_deref().map(str::trim))
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn update_role(
    pool: &Pool<Postgres>,
    id: i64,
    role: &str,
) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET role = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, email, nom, prenom, role, actif, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(role)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Activate or deactivate an account. Deactivation also revokes its sessions.
pub async fn update_status(
    pool: &Pool<Postgres>,
    id: i64,
    actif: bool,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET actif = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, email, nom, prenom, role, actif, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(actif)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    if user.is_some() && !actif {
        revoke_all_refresh_tokens(pool, id).await?;
    }
    Ok(user)
}

pub async fn update_password(
    pool: &Pool<Postgres>,
    id: i64,
    password_hash: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &Pool<Postgres>, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

// ── Refresh tokens ──────────────────────────────────────────────

/// Persist the hash of an issued refresh token.
pub async fn store_refresh_token(
    pool: &Pool<Postgres>,
    user_id: i64,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

/// Revoke a live refresh token and return its owner.
///
/// The UPDATE is the check: a token already revoked, expired or unknown
/// yields `None`, so a token can be consumed at most once.
pub async fn consume_refresh_token(
    pool: &Pool<Postgres>,
    token_hash: &str,
) -> Result<Option<i64>, AppError> {
    sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE refresh_tokens SET revoked = TRUE
        WHERE token_hash = $1 AND revoked = FALSE AND expires_at > NOW()
        RETURNING user_id
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn revoke_all_refresh_tokens(pool: &Pool<Postgres>, user_id: i64) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE",
    )
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected())
}
