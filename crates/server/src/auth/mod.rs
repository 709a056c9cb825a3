pub mod extractors;
pub mod jwt;
pub mod middleware;
pub mod password;

use shared_types::{AppError, CreateUserRequest};
use sqlx::{Pool, Postgres};

/// Create the first administrator from `ADMIN_EMAIL` / `ADMIN_PASSWORD`.
///
/// Runs only while the users table is empty. Returns `true` when an account
/// was created.
pub async fn bootstrap_admin(pool: &Pool<Postgres>) -> Result<bool, AppError> {
    let email = std::env::var("ADMIN_EMAIL").unwrap_or_default();
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_default();
    if email.trim().is_empty() || password.is_empty() {
        return Ok(false);
    }

    if crate::repo::user::count(pool).await? > 0 {
        return Ok(false);
    }

    let hash = password::hash_password(&password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {}", e)))?;

    let req = CreateUserRequest {
        email: email.trim().to_lowercase(),
        password: String::new(),
        nom: "Administrateur".to_string(),
        prenom: String::new(),
        role: Some("admin".to_string()),
    };
    let user = crate::repo::user::create(pool, &req, &hash).await?;
    tracing::info!(user_id = user.id, email = %user.email, "Bootstrapped administrator account");
    Ok(true)
}
