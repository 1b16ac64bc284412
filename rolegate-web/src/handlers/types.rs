//! Request and response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::users::DEFAULT_PAGE_SIZE;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Server status
    pub status: String,
    /// Crate version
    pub version: String,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// Protected read payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataResponse {
    pub data: String,
}

/// Plain message body, also used for 403
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of a write
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WriteResponse {
    pub message: String,
    /// Number of stored records after the write
    pub stored: usize,
}

/// The caller as seen by the permission guard
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUserResponse {
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
}

/// Pagination for user listings
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Users to skip
    #[serde(default)]
    pub skip: usize,
    /// Page size, at most 100
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ListUsersQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}
