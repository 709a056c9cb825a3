use axum::{extract::State, http::StatusCode, Json};
use shared_types::{
    AppError, AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, User,
};
use sqlx::{Pool, Postgres};

use crate::auth::extractors::AuthRequired;
use crate::auth::{jwt, password as pw};
use crate::error_convert::ValidateRequest;

/// Issue an access/refresh pair for `user` and persist the refresh hash.
async fn issue_tokens(pool: &Pool<Postgres>, user: User) -> Result<AuthResponse, AppError> {
    let access_token = jwt::create_access_token(user.id, &user.email, &user.role)
        .map_err(|e| AppError::internal(format!("Token creation failed: {}", e)))?;
    let (refresh_token, expires_at) = jwt::create_refresh_token(user.id, &user.email, &user.role)
        .map_err(|e| AppError::internal(format!("Token creation failed: {}", e)))?;

    crate::repo::user::store_refresh_token(pool, user.id, &jwt::hash_token(&refresh_token), expires_at)
        .await?;

    Ok(AuthResponse {
        user,
        access_token,
        refresh_token,
        expires_in: jwt::access_token_expiry_minutes() * 60,
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = AppError),
        (status = 403, description = "Account disabled", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body), fields(email = %body.email))]
pub async fn login(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    body.validate_request()?;

    let email = body.email.trim().to_lowercase();
    let credentials = crate::repo::user::find_credentials_by_email(&pool, &email).await?;

    // Unknown emails still pay for one hash verification.
    let valid = pw::verify_or_burn(
        &body.password,
        credentials.as_ref().map(|c| c.password_hash.as_str()),
    );
    let credentials = match credentials {
        Some(c) if valid => c,
        _ => return Err(AppError::unauthorized("Invalid email or password")),
    };

    if !credentials.user.actif {
        return Err(AppError::forbidden("This account is disabled"));
    }

    let user = credentials.user;
    crate::audit::record(&pool, Some(user.id), "login", "utilisateur", Some(user.id.to_string()), None)
        .await;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(issue_tokens(&pool, user).await?))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Rotated token pair", body = AuthResponse),
        (status = 401, description = "Invalid or revoked refresh token", body = AppError),
        (status = 403, description = "Account disabled", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn refresh(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let claims = jwt::validate_refresh_token(&body.refresh_token)
        .map_err(|_| AppError::unauthorized("Invalid refresh token"))?;

    let owner = crate::repo::user::consume_refresh_token(&pool, &jwt::hash_token(&body.refresh_token))
        .await?
        .ok_or_else(|| AppError::unauthorized("Refresh token revoked or unknown"))?;
    if owner != claims.sub {
        return Err(AppError::unauthorized("Invalid refresh token"));
    }

    let user = crate::repo::user::find_by_id(&pool, owner)
        .await?
        .ok_or_else(|| AppError::unauthorized("Account no longer exists"))?;
    if !user.actif {
        return Err(AppError::forbidden("This account is disabled"));
    }

    Ok(Json(issue_tokens(&pool, user).await?))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Every refresh token of the caller revoked"),
        (status = 401, description = "Not authenticated", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool))]
pub async fn logout(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
) -> Result<StatusCode, AppError> {
    let revoked = crate::repo::user::revoke_all_refresh_tokens(&pool, claims.sub).await?;
    tracing::info!(user_id = claims.sub, revoked, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool))]
pub async fn me(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
) -> Result<Json<User>, AppError> {
    let user = crate::repo::user::find_by_id(&pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", claims.sub)))?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed, other sessions revoked"),
        (status = 401, description = "Not authenticated", body = AppError),
        (status = 422, description = "Wrong current password or weak new password", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn change_password(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    body.validate_request()?;

    let credentials = crate::repo::user::find_credentials_by_id(&pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", claims.sub)))?;

    let matches = pw::verify_password(&body.current_password, &credentials.password_hash)
        .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;
    if !matches {
        return Err(AppError::invalid_field(
            "current_password",
            "Current password is incorrect",
        ));
    }

    let hash = pw::hash_password(&body.new_password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {}", e)))?;
    crate::repo::user::update_password(&pool, claims.sub, &hash).await?;
    crate::repo::user::revoke_all_refresh_tokens(&pool, claims.sub).await?;

    crate::audit::log_with(
        &pool,
        &claims,
        "update",
        "utilisateur",
        claims.sub,
        serde_json::json!({ "champ": "password" }),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
