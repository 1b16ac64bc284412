//! JWT issuing and verification
//!
//! Tokens are HS256 with `{sub, iat, exp}` claims. The signing secret is
//! injected at construction; [`JwtService`] is also the [`IdentitySource`]
//! the permission evaluator resolves bearer tokens with.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rolegate_authz::{IdentityError, IdentitySource};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};
use utoipa::ToSchema;

/// JWT signing and verification keys
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
}

impl Claims {
    /// Claims expiring `ttl` from now; fails if the expiry is not representable
    pub fn new(username: &str, ttl: Duration) -> Result<Self, AuthError> {
        let now = Utc::now();
        let expires = now.checked_add_signed(ttl).ok_or_else(|| {
            warn!("Token lifetime overflows the clock");
            AuthError::TokenCreation
        })?;

        Ok(Self {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        })
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Login response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

impl AccessToken {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Login and registration errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing credentials")]
    MissingCredentials,
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("Unknown role: {0}")]
    UnknownRole(String),
    #[error("User already exists: {0}")]
    UserExists(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Token creation failed")]
    TokenCreation,
    #[error("Token lifetime of {0} minutes is out of range")]
    InvalidTokenLifetime(i64),
    #[error("Password hashing failed")]
    PasswordHash,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::MissingCredentials => (StatusCode::BAD_REQUEST, "missing_credentials"),
            AuthError::WeakPassword(_) => (StatusCode::BAD_REQUEST, "weak_password"),
            AuthError::UnknownRole(_) => (StatusCode::BAD_REQUEST, "unknown_role"),
            AuthError::UserExists(_) => (StatusCode::CONFLICT, "user_exists"),
            AuthError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
            AuthError::TokenCreation => {
                (StatusCode::INTERNAL_SERVER_ERROR, "token_creation_failed")
            }
            AuthError::PasswordHash => (StatusCode::INTERNAL_SERVER_ERROR, "password_hash_failed"),
            AuthError::InvalidTokenLifetime(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "token_creation_failed")
            }
            AuthError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = match &self {
            AuthError::InvalidCredentials => "Invalid username or password".to_string(),
            AuthError::MissingCredentials => "Username and password are required".to_string(),
            AuthError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            warn!("Authentication failure: {}", self);
        }

        let body = Json(json!({
            "error": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Strip an optional `Bearer ` scheme from an Authorization header value
pub fn bearer_token(header: &str) -> &str {
    let header = header.trim();
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .unwrap_or(header)
        .trim()
}

/// Issues and verifies access tokens
#[derive(Clone)]
pub struct JwtService {
    keys: Arc<Keys>,
    ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &[u8], ttl_minutes: i64) -> Result<Self, AuthError> {
        let ttl = Duration::try_minutes(ttl_minutes)
            .ok_or(AuthError::InvalidTokenLifetime(ttl_minutes))?;

        Ok(Self {
            keys: Arc::new(Keys::new(secret)),
            ttl,
        })
    }

    /// Token lifetime in seconds
    pub fn expires_in(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Sign arbitrary claims
    pub fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys.encoding).map_err(|e| {
            warn!("Failed to encode token: {}", e);
            AuthError::TokenCreation
        })
    }

    /// Issue an access token for `username`
    pub fn generate_token(&self, username: &str) -> Result<AccessToken, AuthError> {
        let claims = Claims::new(username, self.ttl)?;
        let token = self.encode_claims(&claims)?;
        debug!("Issued token for {}", username);
        Ok(AccessToken::bearer(token, self.expires_in()))
    }

    /// Verify signature and expiry, returning the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, IdentityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::Expired,
                ErrorKind::InvalidSignature => IdentityError::InvalidSignature,
                _ => IdentityError::Malformed,
            })
    }
}

impl IdentitySource for JwtService {
    fn resolve(&self, token: &str) -> Result<String, IdentityError> {
        let claims = self.verify_token(bearer_token(token))?;
        if claims.sub.trim().is_empty() {
            return Err(IdentityError::Malformed);
        }
        Ok(claims.sub)
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("ttl_minutes", &self.ttl.num_minutes())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(b"unit-test-secret", 60).unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let jwt = service();
        let token = jwt.generate_token("user1").unwrap();

        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 3600);

        let claims = jwt.verify_token(&token.access_token).unwrap();
        assert_eq!(claims.sub, "user1");
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = service();
        let claims = Claims {
            sub: "user1".to_string(),
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = jwt.encode_claims(&claims).unwrap();

        assert_eq!(jwt.verify_token(&token), Err(IdentityError::Expired));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let token = JwtService::new(b"someone-else", 60)
            .unwrap()
            .generate_token("user1")
            .unwrap();

        assert_eq!(
            service().verify_token(&token.access_token),
            Err(IdentityError::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(
            service().verify_token("not-a-jwt"),
            Err(IdentityError::Malformed)
        );
    }

    #[test]
    fn test_resolve_accepts_bearer_prefix() {
        let jwt = service();
        let token = jwt.generate_token("user2").unwrap().access_token;

        assert_eq!(jwt.resolve(&format!("Bearer {}", token)).unwrap(), "user2");
        assert_eq!(jwt.resolve(&token).unwrap(), "user2");
    }

    #[test]
    fn test_out_of_range_lifetimes_fail_without_panicking() {
        assert!(matches!(
            JwtService::new(b"s", i64::MAX),
            Err(AuthError::InvalidTokenLifetime(i64::MAX))
        ));

        // Representable as a duration, but not as an expiry date
        let jwt = JwtService::new(b"s", 10_000_000_000_000).unwrap();
        assert!(matches!(
            jwt.generate_token("user1"),
            Err(AuthError::TokenCreation)
        ));
        assert!(Claims::new("user1", Duration::try_days(100_000_000).unwrap()).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), "abc");
        assert_eq!(bearer_token("  bearer abc  "), "abc");
        assert_eq!(bearer_token("abc"), "abc");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::InvalidCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::UserExists("a".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AuthError::WeakPassword(8).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
