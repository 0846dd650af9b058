//! Supabase session tokens. The dashboard signs users in through Supabase;
//! this service only verifies the HS256 access token it forwards.

pub mod scope;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use scope::{load_permissions, scope_condition, UserScope};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Supabase auth user id.
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    /// Postgres role the token maps to (`authenticated`, `service_role`).
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl Claims {
    pub fn new(sub: Uuid, email: Option<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub,
            email,
            role: Some("authenticated".to_string()),
            exp: (now + ttl).timestamp(),
            iat: Some(now.timestamp()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    Missing,
    #[error("Authorization header must use Bearer token format")]
    Malformed,
    #[error("Invalid session token: {0}")]
    Invalid(String),
    #[error("Session verification is not configured")]
    NotConfigured,
}

/// Caller identity taken from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { user_id: claims.sub, email: claims.email }
    }
}

/// `Authorization` header value → bearer token.
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let token = header.strip_prefix("Bearer ").ok_or(AuthError::Malformed)?.trim();
    if token.is_empty() {
        return Err(AuthError::Malformed);
    }
    Ok(token)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::NotConfigured);
    }
    let mut validation = Validation::new(Algorithm::HS256);
    // Supabase sets aud to "authenticated"; the signature is what matters here.
    validation.validate_aud = false;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::Invalid(e.to_string()))
}

/// Sign claims the way Supabase does. Used by tests and local tooling.
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::NotConfigured);
    }
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issued_tokens_verify() {
        let id = Uuid::new_v4();
        let token = issue_token(&Claims::new(id, Some("a@b.c".into()), Duration::minutes(5)), SECRET).unwrap();
        let user = AuthUser::from(verify_token(&token, SECRET).unwrap());
        assert_eq!(user.user_id, id);
        assert_eq!(user.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn wrong_secret_and_expiry_rejected() {
        let claims = Claims::new(Uuid::new_v4(), None, Duration::minutes(5));
        let token = issue_token(&claims, SECRET).unwrap();
        assert!(matches!(verify_token(&token, "other"), Err(AuthError::Invalid(_))));

        let expired = Claims::new(Uuid::new_v4(), None, Duration::hours(-2));
        let token = issue_token(&expired, SECRET).unwrap();
        assert!(matches!(verify_token(&token, SECRET), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn bearer_prefix_required() {
        assert_eq!(bearer_token("Bearer abc").unwrap(), "abc");
        assert_eq!(bearer_token("Basic abc").unwrap_err(), AuthError::Malformed);
        assert_eq!(bearer_token("Bearer   ").unwrap_err(), AuthError::Malformed);
        assert_eq!(verify_token("x", "").unwrap_err(), AuthError::NotConfigured);
    }
}
