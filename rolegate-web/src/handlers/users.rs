//! User listing

use super::types::{ListUsersQuery, MessageResponse};
use crate::{auth::UserPage, AppState};
use axum::{
    extract::{Query, State},
    response::Json,
};

/// List users sorted by name (`read`)
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    summary = "List users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "One page of users", body = UserPage),
        (status = 403, description = "Access denied", body = MessageResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Json<UserPage> {
    Json(state.user_service.list(query.skip, query.limit))
}
