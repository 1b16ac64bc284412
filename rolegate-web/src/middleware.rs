//! Permission guard middleware
//!
//! Attached per route with `route_layer`. It reads the Authorization header,
//! asks the evaluator, and either short-circuits with a bare 403 or attaches
//! the [`Grant`] to the request and runs the handler.

use crate::{auth::AccessDenied, AppState};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use rolegate_authz::{Decision, Grant};
use tracing::debug;

/// State handed to [`require_permission`]: the app plus the permission a route needs
#[derive(Clone)]
pub struct PermissionGuard {
    state: AppState,
    permission: &'static str,
}

impl PermissionGuard {
    pub fn new(state: AppState, permission: &'static str) -> Self {
        Self { state, permission }
    }

    pub fn permission(&self) -> &'static str {
        self.permission
    }
}

/// Evaluate the route's permission before the handler runs
pub async fn require_permission(
    State(guard): State<PermissionGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match guard
        .state
        .evaluator
        .authorize(token.as_deref(), guard.permission)
    {
        Decision::Allow(grant) => {
            request.extensions_mut().insert::<Grant>(grant);
            next.run(request).await
        }
        Decision::Deny(reason) => {
            debug!(
                path = %request.uri().path(),
                permission = guard.permission,
                %reason,
                "Request rejected by permission guard"
            );
            AccessDenied.into_response()
        }
    }
}
