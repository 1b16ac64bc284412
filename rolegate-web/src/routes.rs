//! Route definitions for the Rolegate web server
//!
//! Protected routes carry the permission guard as a `route_layer`, so an
//! unmatched method still gets 405 rather than 403.

use crate::{
    auth, handlers,
    middleware::{require_permission, PermissionGuard},
    AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let guard = |permission: &'static str| {
        from_fn_with_state(
            PermissionGuard::new(state.clone(), permission),
            require_permission,
        )
    };

    Router::new()
        // Open endpoints
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(handlers::openapi_json))
        .route("/auth/login", post(auth::handlers::login_user))
        // Guarded data endpoints
        .route(
            "/read",
            get(handlers::read_data).route_layer(guard("read")),
        )
        .route(
            "/write",
            post(handlers::write_data).route_layer(guard("write")),
        )
        .route(
            "/delete",
            delete(handlers::delete_data).route_layer(guard("delete")),
        )
        // Users
        .route("/me", get(handlers::current_user).route_layer(guard("read")))
        .route(
            "/users",
            get(handlers::list_users)
                .route_layer(guard("read"))
                .merge(post(auth::handlers::create_user).route_layer(guard("manage_users"))),
        )
}

#[cfg(test)]
mod tests {
    use crate::{create_app, test_support::test_state};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    async fn call(
        app: Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health_check_route() {
        let app = create_app(test_state());
        let (status, body) = call(app, Method::GET, "/api/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_read_requires_token() {
        let app = create_app(test_state());
        let (status, body) = call(app, Method::GET, "/api/read", None).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access denied");
    }

    #[tokio::test]
    async fn test_delete_by_role() {
        let state = test_state();
        let admin = state.user_service.issue_token("user1").unwrap().access_token;
        let user = state.user_service.issue_token("user2").unwrap().access_token;
        let app = create_app(state);

        let (status, _) = call(app.clone(), Method::DELETE, "/api/delete", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(app, Method::DELETE, "/api/delete", Some(&user)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_me_reports_role_permissions() {
        let state = test_state();
        let user = state.user_service.issue_token("user2").unwrap().access_token;
        let app = create_app(state);

        let (status, body) = call(app, Method::GET, "/api/me", Some(&user)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "user2");
        assert_eq!(body["role"], "user");
        assert_eq!(body["permissions"], serde_json::json!(["read"]));
    }

    #[tokio::test]
    async fn test_users_listing_is_paged() {
        let state = test_state();
        let user = state.user_service.issue_token("user2").unwrap().access_token;
        let app = create_app(state);

        let (status, body) =
            call(app, Method::GET, "/api/users?skip=1&limit=5", Some(&user)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["users"][0]["username"], "user2");
    }

    #[tokio::test]
    async fn test_unguarded_method_is_not_allowed() {
        let app = create_app(test_state());
        let (status, _) = call(app, Method::PUT, "/api/read", None).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let app = create_app(test_state());
        let (status, body) = call(app, Method::GET, "/api/openapi.json", None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/read"].is_object());
    }
}
