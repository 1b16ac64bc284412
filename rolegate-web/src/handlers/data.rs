//! Protected data endpoints

use super::types::{CurrentUserResponse, DataResponse, MessageResponse, WriteResponse};
use crate::{auth::Caller, AppState};
use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::Value;
use tracing::info;

/// Read protected data (`read`)
#[utoipa::path(
    get,
    path = "/api/read",
    tag = "Data",
    summary = "Read protected data",
    responses(
        (status = 200, description = "Protected data", body = DataResponse),
        (status = 403, description = "Access denied", body = MessageResponse)
    ),
    security(("bearer" = []))
)]
pub async fn read_data(Caller(grant): Caller) -> Json<DataResponse> {
    info!("Access granted to {} for {}", grant.username, grant.permission);
    Json(DataResponse {
        data: "This is some protected data.".to_string(),
    })
}

/// Store a JSON document (`write`)
#[utoipa::path(
    post,
    path = "/api/write",
    tag = "Data",
    summary = "Write data",
    description = "Store the JSON request body. Only the most recent 1000 documents are kept.",
    responses(
        (status = 201, description = "Data stored", body = WriteResponse),
        (status = 403, description = "Access denied", body = MessageResponse)
    ),
    security(("bearer" = []))
)]
pub async fn write_data(
    State(state): State<AppState>,
    Caller(grant): Caller,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<WriteResponse>) {
    let stored = state.store_record(payload).await;
    info!("Data written by {} ({} records)", grant.username, stored);

    (
        StatusCode::CREATED,
        Json(WriteResponse {
            message: "Data written successfully".to_string(),
            stored,
        }),
    )
}

/// Clear stored documents (`delete`)
#[utoipa::path(
    delete,
    path = "/api/delete",
    tag = "Data",
    summary = "Delete data",
    responses(
        (status = 200, description = "Data deleted", body = MessageResponse),
        (status = 403, description = "Access denied", body = MessageResponse)
    ),
    security(("bearer" = []))
)]
pub async fn delete_data(
    State(state): State<AppState>,
    Caller(grant): Caller,
) -> Json<MessageResponse> {
    let removed = state.clear_records().await;
    info!("Data deleted by {} ({} records)", grant.username, removed);

    Json(MessageResponse::new("Data deleted successfully"))
}

/// The authenticated caller and what their role allows (`read`)
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Users",
    summary = "Current user",
    responses(
        (status = 200, description = "Caller identity", body = CurrentUserResponse),
        (status = 403, description = "Access denied", body = MessageResponse)
    ),
    security(("bearer" = []))
)]
pub async fn current_user(
    State(state): State<AppState>,
    Caller(grant): Caller,
) -> Json<CurrentUserResponse> {
    let permissions = state
        .evaluator
        .permissions_of(&grant.username)
        .into_iter()
        .map(|p| p.to_string())
        .collect();

    Json(CurrentUserResponse {
        username: grant.username,
        role: grant.role,
        permissions,
    })
}
