//! Login and user registration endpoints
//!
//! Both run Argon2 work, so the service call goes through `spawn_blocking`.

use super::{
    jwt::{AccessToken, AuthError},
    users::{LoginRequest, RegisterRequest, UserInfo},
    Caller,
};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use tracing::info;

/// User login endpoint
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    summary = "Log in",
    description = "Exchange a username and password for a bearer token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = AccessToken),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login_user(
    State(app_state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AccessToken>, AuthError> {
    info!("User login attempt: {}", request.username);

    let username = request.username.clone();
    let service = app_state.user_service.clone();
    let token = tokio::task::spawn_blocking(move || service.login(request))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))??;

    info!("User logged in successfully: {}", username);
    Ok(Json(token))
}

/// User registration endpoint, guarded by `manage_users`
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    summary = "Create user",
    description = "Register a user with a password and one configured role",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserInfo),
        (status = 400, description = "Invalid username, password or role"),
        (status = 403, description = "Access denied"),
        (status = 409, description = "User already exists")
    ),
    security(("bearer" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    Caller(grant): Caller,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserInfo>), AuthError> {
    info!(
        "User registration by {}: {} as {}",
        grant.username, request.username, request.role
    );

    let service = app_state.user_service.clone();
    let user = tokio::task::spawn_blocking(move || service.register(request))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))??;

    Ok((StatusCode::CREATED, Json(user)))
}
