//! OpenAPI document for the Rolegate HTTP API

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::auth::{AccessToken, LoginRequest, RegisterRequest, UserInfo, UserPage};
use crate::handlers::{
    CurrentUserResponse, DataResponse, HealthResponse, MessageResponse, WriteResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rolegate API",
        description = "Role-based permission checks in front of a small data API",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    paths(
        // Health
        crate::handlers::health_check,

        // Auth
        crate::auth::handlers::login_user,

        // Data
        crate::handlers::read_data,
        crate::handlers::write_data,
        crate::handlers::delete_data,

        // Users
        crate::handlers::current_user,
        crate::handlers::list_users,
        crate::auth::handlers::create_user,
    ),
    components(
        schemas(
            HealthResponse,
            AccessToken,
            LoginRequest,
            RegisterRequest,
            UserInfo,
            UserPage,
            DataResponse,
            MessageResponse,
            WriteResponse,
            CurrentUserResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Token issuing"),
        (name = "Data", description = "Permission-guarded data operations"),
        (name = "Users", description = "User registry"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Bearer token security scheme
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Get the OpenAPI document as JSON
pub fn openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}
