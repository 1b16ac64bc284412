//! Rolegate Web Server
//!
//! HTTP front for the permission evaluator: token login, a permission guard
//! middleware, and a handful of protected endpoints.

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use server::{RolegateServer, RolegateServerBuilder};
pub use state::AppState;

use axum::{extract::DefaultBodyLimit, Router};
use rolegate_core::{AuthConfig, GateConfig, GateError};
use tower_http::trace::TraceLayer;

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes(&state))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}

/// Configuration for the web server
#[derive(Clone)]
pub struct WebConfig {
    /// Roles, seeded users, server and token settings
    pub gate: GateConfig,
    /// HS256 signing secret; generated in dev mode when absent
    pub jwt_secret: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

impl WebConfig {
    pub fn new(gate: GateConfig) -> Self {
        Self {
            gate,
            jwt_secret: None,
        }
    }

    /// Apply `ROLEGATE_HOST`, `ROLEGATE_PORT`, `ROLEGATE_DEV_MODE` and the
    /// signing secret from the environment
    pub fn from_env(mut gate: GateConfig) -> Self {
        if let Ok(host) = std::env::var("ROLEGATE_HOST") {
            gate.server.host = host;
        }
        if let Some(port) = std::env::var("ROLEGATE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            gate.server.port = port;
        }
        if let Some(dev_mode) = std::env::var("ROLEGATE_DEV_MODE")
            .ok()
            .and_then(|d| d.parse().ok())
        {
            gate.server.dev_mode = dev_mode;
        }

        Self {
            gate,
            jwt_secret: AuthConfig::secret_from_env(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.gate.server.host, self.gate.server.port)
    }
}

impl std::fmt::Debug for WebConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebConfig")
            .field("gate", &self.gate)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] GateError),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;
