use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{
    AppError, AuditLog, AuditLogParams, CreateUserRequest, PaginatedResponse, UpdateUserRequest,
    UpdateUserRoleRequest, UpdateUserStatusRequest, User, UserListParams, AUDIT_ACTIONS,
    USER_ROLES,
};

use crate::auth::extractors::{RoleRequired, ROLE_ADMIN};
use crate::auth::password as pw;
use crate::error_convert::{check_vocab, ValidateRequest};

fn user_not_found(id: i64) -> AppError {
    AppError::not_found(format!("User {} not found", id))
}

// ── Users ──────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/utilisateurs",
    params(UserListParams),
    responses(
        (status = 200, description = "Paginated users", body = PaginatedResponse<User>),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "utilisateurs"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_users(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_ADMIN>,
    Query(params): Query<UserListParams>,
) -> Result<Json<PaginatedResponse<User>>, AppError> {
    if let Some(role) = params.role.as_deref() {
        check_vocab("role", role, USER_ROLES)?;
    }
    Ok(Json(crate::repo::user::list(&pool, &params).await?))
}

#[utoipa::path(
    post,
    path = "/api/utilisateurs",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 409, description = "Email already used", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "utilisateurs"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn create_user(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_ADMIN>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    body.validate_request()?;
    if let Some(role) = body.role.as_deref() {
        check_vocab("role", role, USER_ROLES)?;
    }

    let hash = pw::hash_password(&body.password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {}", e)))?;
    let user = crate::repo::user::create(&pool, &body, &hash).await?;

    crate::audit::log_with(
        &pool,
        &claims,
        "create",
        "utilisateur",
        user.id,
        serde_json::json!({ "email": user.email, "role": user.role }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/utilisateurs/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "utilisateurs"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_user(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_ADMIN>,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    let user = crate::repo::user::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/utilisateurs/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "Not found", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "utilisateurs"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn update_user(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_ADMIN>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    body.validate_request()?;

    let user = crate::repo::user::update(&pool, id, &body)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    crate::audit::log(&pool, &claims, "update", "utilisateur", id).await;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/utilisateurs/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete your own account", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "utilisateurs"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_user(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_ADMIN>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if id == claims.sub {
        return Err(AppError::bad_request("You cannot delete your own account"));
    }

    if !crate::repo::user::delete(&pool, id).await? {
        return Err(user_not_found(id));
    }

    crate::audit::log(&pool, &claims, "delete", "utilisateur", id).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/api/utilisateurs/{id}/role",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = User),
        (status = 400, description = "Invalid role or self-demotion", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "utilisateurs"
)]
#[tracing::instrument(skip(pool))]
pub async fn update_user_role(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_ADMIN>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRoleRequest>,
) -> Result<Json<User>, AppError> {
    check_vocab("role", &body.role, USER_ROLES)?;
    if id == claims.sub && body.role != "admin" {
        return Err(AppError::bad_request("You cannot remove your own admin role"));
    }

    let user = crate::repo::user::update_role(&pool, id, &body.role)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    crate::audit::log_with(
        &pool,
        &claims,
        "status",
        "utilisateur",
        id,
        serde_json::json!({ "role": body.role }),
    )
    .await;
    Ok(Json(user))
}

#[utoipa::path(
    patch,
    path = "/api/utilisateurs/{id}/statut",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserStatusRequest,
    responses(
        (status = 200, description = "Account (de)activated", body = User),
        (status = 400, description = "Self-deactivation", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "utilisateurs"
)]
#[tracing::instrument(skip(pool))]
pub async fn update_user_status(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_ADMIN>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserStatusRequest>,
) -> Result<Json<User>, AppError> {
    if id == claims.sub && !body.actif {
        return Err(AppError::bad_request("You cannot deactivate your own account"));
    }

    let user = crate::repo::user::update_status(&pool, id, body.actif)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    crate::audit::log_with(
        &pool,
        &claims,
        "status",
        "utilisateur",
        id,
        serde_json::json!({ "actif": body.actif }),
    )
    .await;
    Ok(Json(user))
}

// ── Audit log ──────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/audit-logs",
    params(AuditLogParams),
    responses(
        (status = 200, description = "Paginated audit trail", body = PaginatedResponse<AuditLog>),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "audit"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_audit_logs(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_ADMIN>,
    Query(params): Query<AuditLogParams>,
) -> Result<Json<PaginatedResponse<AuditLog>>, AppError> {
    if let Some(action) = params.action.as_deref() {
        check_vocab("action", action, AUDIT_ACTIONS)?;
    }
    if let (Some(du), Some(au)) = (params.du, params.au) {
        if du > au {
            return Err(AppError::bad_request("du must not be after au"));
        }
    }
    Ok(Json(crate::audit::list(&pool, &params).await?))
}
