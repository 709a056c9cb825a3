use axum::{extract::FromRequestParts, http::request::Parts};
use shared_types::{AppError, UserRole};

use super::jwt::Claims;

/// Role constants for `RoleRequired`, matching `UserRole` variants.
pub const ROLE_LECTEUR: u8 = 0;
pub const ROLE_COLLABORATEUR: u8 = 1;
pub const ROLE_COMPTABLE: u8 = 2;
pub const ROLE_GESTIONNAIRE: u8 = 3;
pub const ROLE_ADMIN: u8 = 4;

/// Map a role constant to the role it stands for.
pub fn required_role(role: u8) -> UserRole {
    match role {
        ROLE_COLLABORATEUR => UserRole::Collaborateur,
        ROLE_COMPTABLE => UserRole::Comptable,
        ROLE_GESTIONNAIRE => UserRole::Gestionnaire,
        ROLE_ADMIN => UserRole::Admin,
        _ => UserRole::Lecteur,
    }
}

/// Extractor that requires authentication. Returns 401 if no valid token.
pub struct AuthRequired(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for AuthRequired {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthRequired)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// Extractor that requires authentication AND a role satisfying `ROLE`.
/// Returns 401 if unauthenticated, 403 if the role is insufficient.
pub struct RoleRequired<const ROLE: u8>(pub Claims);

impl<const ROLE: u8, S: Send + Sync> FromRequestParts<S> for RoleRequired<ROLE> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        let user_role = UserRole::from_str_or_default(&claims.role);
        let required = required_role(ROLE);

        if !user_role.satisfies(&required) {
            return Err(AppError::forbidden(format!(
                "{} role or higher required",
                required.as_str()
            )));
        }

        Ok(RoleRequired(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_constants_map_to_roles() {
        assert_eq!(required_role(ROLE_LECTEUR), UserRole::Lecteur);
        assert_eq!(required_role(ROLE_COLLABORATEUR), UserRole::Collaborateur);
        assert_eq!(required_role(ROLE_COMPTABLE), UserRole::Comptable);
        assert_eq!(required_role(ROLE_GESTIONNAIRE), UserRole::Gestionnaire);
        assert_eq!(required_role(ROLE_ADMIN), UserRole::Admin);
        assert_eq!(required_role(200), UserRole::Lecteur);
    }
}
