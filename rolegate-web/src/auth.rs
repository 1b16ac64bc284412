//! Authentication: tokens, the user registry and the caller extractor

pub mod handlers;
pub mod jwt;
pub mod users;

pub use jwt::{bearer_token, AccessToken, AuthError, Claims, JwtService};
pub use users::{
    hash_password, verify_password, LoginRequest, RegisterRequest, UserData, UserInfo, UserPage,
    UserService, UserStore,
};

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use rolegate_authz::Grant;
use serde_json::json;

/// Body sent with every 403, whatever the underlying deny reason was
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied";

/// Uniform 403 response
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessDenied;

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": ACCESS_DENIED_MESSAGE })),
        )
            .into_response()
    }
}

/// The grant the permission guard attached to this request
///
/// Only usable on routes behind the guard; anywhere else it rejects with 403.
#[derive(Debug, Clone)]
pub struct Caller(pub Grant);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AccessDenied;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Grant>()
            .cloned()
            .map(Caller)
            .ok_or(AccessDenied)
    }
}
