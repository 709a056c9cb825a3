use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "validation")]
use validator::Validate;

/// Role of a staff account, ordered by what it may change.
///
/// - `Admin` manages accounts and reads the audit log; satisfies every role.
/// - `Gestionnaire` deletes top-level records and runs imports.
/// - `Comptable` records fees, payments, rent collections and invoices.
/// - `Collaborateur` maintains cases, hearings, recovery actions and properties.
/// - `Lecteur` reads everything, writes nothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Gestionnaire,
    Comptable,
    Collaborateur,
    #[default]
    Lecteur,
}

pub const USER_ROLES: &[&str] = &[
    "admin",
    "gestionnaire",
    "comptable",
    "collaborateur",
    "lecteur",
];

pub fn is_valid_user_role(s: &str) -> bool {
    USER_ROLES.contains(&s)
}

impl UserRole {
    /// Parse from the JWT `role` claim. Unknown values fall back to `Lecteur`.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => UserRole::Admin,
            "gestionnaire" => UserRole::Gestionnaire,
            "comptable" => UserRole::Comptable,
            "collaborateur" => UserRole::Collaborateur,
            _ => UserRole::Lecteur,
        }
    }

    /// Lowercase string for database / JWT storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Gestionnaire => "gestionnaire",
            UserRole::Comptable => "comptable",
            UserRole::Collaborateur => "collaborateur",
            UserRole::Lecteur => "lecteur",
        }
    }

    /// Returns true if this role satisfies the `required` role.
    pub fn satisfies(&self, required: &UserRole) -> bool {
        match self {
            UserRole::Admin => true,
            UserRole::Gestionnaire => !matches!(required, UserRole::Admin),
            UserRole::Comptable => matches!(required, UserRole::Comptable | UserRole::Lecteur),
            UserRole::Collaborateur => {
                matches!(required, UserRole::Collaborateur | UserRole::Lecteur)
            }
            UserRole::Lecteur => matches!(required, UserRole::Lecteur),
        }
    }
}

/// A staff account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub email: String,
    pub nom: String,
    pub prenom: String,
    pub role: String,
    pub actif: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> UserRole {
        UserRole::from_str_or_default(&self.role)
    }

    pub fn nom_complet(&self) -> String {
        format!("{} {}", self.prenom, self.nom).trim().to_string()
    }
}

/// Login request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct LoginRequest {
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Password is required"))
    )]
    pub password: String,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 8, message = "Password must be at least 8 characters"))
    )]
    pub new_password: String,
}

/// Request DTO for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateUserRequest {
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 8, message = "Password must be at least 8 characters"))
    )]
    pub password: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Nom is required"))
    )]
    pub nom: String,
    #[serde(default)]
    pub prenom: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Request DTO for updating a user (only provided fields are changed).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Nom cannot be empty"))
    )]
    pub nom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prenom: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateUserRoleRequest {
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateUserStatusRequest {
    pub actif: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct UserListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub role: Option<String>,
    pub actif: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_defaults_to_lecteur() {
        assert_eq!(UserRole::from_str_or_default("ADMIN"), UserRole::Admin);
        assert_eq!(
            UserRole::from_str_or_default("comptable"),
            UserRole::Comptable
        );
        assert_eq!(UserRole::from_str_or_default("root"), UserRole::Lecteur);
        assert_eq!(UserRole::from_str_or_default(""), UserRole::Lecteur);
    }

    #[test]
    fn role_strings_roundtrip() {
        for s in USER_ROLES {
            assert_eq!(UserRole::from_str_or_default(s).as_str(), *s);
        }
    }

    #[test]
    fn admin_satisfies_everything() {
        for s in USER_ROLES {
            assert!(UserRole::Admin.satisfies(&UserRole::from_str_or_default(s)));
        }
    }

    #[test]
    fn gestionnaire_satisfies_all_but_admin() {
        let g = UserRole::Gestionnaire;
        assert!(!g.satisfies(&UserRole::Admin));
        assert!(g.satisfies(&UserRole::Gestionnaire));
        assert!(g.satisfies(&UserRole::Comptable));
        assert!(g.satisfies(&UserRole::Collaborateur));
        assert!(g.satisfies(&UserRole::Lecteur));
    }

    #[test]
    fn comptable_and_collaborateur_are_disjoint() {
        assert!(UserRole::Comptable.satisfies(&UserRole::Lecteur));
        assert!(!UserRole::Comptable.satisfies(&UserRole::Collaborateur));
        assert!(UserRole::Collaborateur.satisfies(&UserRole::Lecteur));
        assert!(!UserRole::Collaborateur.satisfies(&UserRole::Comptable));
        assert!(!UserRole::Collaborateur.satisfies(&UserRole::Gestionnaire));
    }

    #[test]
    fn lecteur_only_reads() {
        assert!(UserRole::Lecteur.satisfies(&UserRole::Lecteur));
        assert!(!UserRole::Lecteur.satisfies(&UserRole::Collaborateur));
        assert!(!UserRole::Lecteur.satisfies(&UserRole::Comptable));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserRole::Gestionnaire).unwrap(),
            "\"gestionnaire\""
        );
    }

    #[test]
    fn nom_complet_trims_missing_prenom() {
        let user = User {
            id: 1,
            email: "a@capco.ci".into(),
            nom: "Kone".into(),
            prenom: "".into(),
            role: "lecteur".into(),
            actif: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(user.nom_complet(), "Kone");
        assert_eq!(user.role(), UserRole::Lecteur);
    }
}
