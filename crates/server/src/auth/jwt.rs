use chrono::{Duration, Utc};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::env_or;

/// Token type discriminator, so a refresh token is never accepted as an access token.
const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

/// JWT claims stored in access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique token identifier; two tokens issued in the same second still differ.
    pub jti: String,
    /// "access" or "refresh".
    pub typ: String,
}

/// SHA-256 of a raw token, hex-encoded. Only this hash is persisted.
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn jwt_secret() -> Result<String, JwtError> {
    match std::env::var("JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => Ok(secret),
        _ => Err(ErrorKind::InvalidKeyFormat.into()),
    }
}

pub fn access_token_expiry_minutes() -> i64 {
    env_or("JWT_ACCESS_TOKEN_EXPIRY_MINUTES", 15)
}

pub fn refresh_token_expiry_days() -> i64 {
    env_or("JWT_REFRESH_TOKEN_EXPIRY_DAYS", 7)
}

fn sign(user_id: i64, email: &str, role: &str, typ: &str, lifetime: Duration) -> Result<(String, chrono::DateTime<Utc>), JwtError> {
    let now = Utc::now();
    let expires_at = now + lifetime;
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role: role.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
        typ: typ.to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret()?.as_bytes()),
    )?;
    Ok((token, expires_at))
}

pub fn create_access_token(user_id: i64, email: &str, role: &str) -> Result<String, JwtError> {
    sign(
        user_id,
        email,
        role,
        TOKEN_TYPE_ACCESS,
        Duration::minutes(access_token_expiry_minutes()),
    )
    .map(|(token, _)| token)
}

/// Create a refresh token and return it with its expiry.
pub fn create_refresh_token(
    user_id: i64,
    email: &str,
    role: &str,
) -> Result<(String, chrono::DateTime<Utc>), JwtError> {
    sign(
        user_id,
        email,
        role,
        TOKEN_TYPE_REFRESH,
        Duration::days(refresh_token_expiry_days()),
    )
}

fn decode_claims(token: &str) -> Result<Claims, JwtError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret()?.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Validate an access token. Refresh tokens are rejected.
pub fn validate_access_token(token: &str) -> Result<Claims, JwtError> {
    let claims = decode_claims(token)?;
    if claims.typ != TOKEN_TYPE_ACCESS {
        return Err(ErrorKind::InvalidToken.into());
    }
    Ok(claims)
}

/// Validate a refresh token. Access tokens are rejected.
pub fn validate_refresh_token(token: &str) -> Result<Claims, JwtError> {
    let claims = decode_claims(token)?;
    if claims.typ != TOKEN_TYPE_REFRESH {
        return Err(ErrorKind::InvalidToken.into());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_secret() {
        std::env::set_var("JWT_SECRET", "test-secret-key-for-jwt-unit-tests");
    }

    #[test]
    fn create_and_validate_access_token() {
        setup_test_secret();
        let token = create_access_token(42, "awa@capco.ci", "comptable").unwrap();
        let claims = validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "awa@capco.ci");
        assert_eq!(claims.role, "comptable");
        assert_eq!(claims.typ, TOKEN_TYPE_ACCESS);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_rejected() {
        setup_test_secret();
        let now = Utc::now();
        let claims = Claims {
            sub: 1,
            email: "expired@capco.ci".to_string(),
            role: "lecteur".to_string(),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            jti: "old".to_string(),
            typ: TOKEN_TYPE_ACCESS.to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(jwt_secret().unwrap().as_bytes()),
        )
        .unwrap();

        assert!(validate_access_token(&token).is_err());
    }

    #[test]
    fn invalid_token_rejected() {
        setup_test_secret();
        assert!(validate_access_token("not.a.valid.jwt").is_err());
        assert!(validate_access_token("").is_err());
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        setup_test_secret();
        let access = create_access_token(1, "a@capco.ci", "admin").unwrap();
        let (refresh, _) = create_refresh_token(1, "a@capco.ci", "admin").unwrap();

        assert!(validate_access_token(&refresh).is_err());
        assert!(validate_refresh_token(&access).is_err());

        let access_claims = validate_access_token(&access).unwrap();
        let refresh_claims = validate_refresh_token(&refresh).unwrap();
        assert!(refresh_claims.exp > access_claims.exp);
        assert_ne!(access_claims.jti, refresh_claims.jti);
    }

    #[test]
    fn hash_token_produces_consistent_hex() {
        let hash1 = hash_token("eyJhbGciOiJIUzI1NiJ9.payload.signature");
        let hash2 = hash_token("eyJhbGciOiJIUzI1NiJ9.payload.signature");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash1, hash_token("another-token"));
    }
}
