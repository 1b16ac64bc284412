//! Integration test helpers
//!
//! Spawns the real server on a random port and talks to it over HTTP.

#![allow(dead_code)]

use rolegate_authz::MemoryAuditSink;
use rolegate_core::{GateConfig, UserSeed};
use rolegate_web::{auth::hash_password, create_app, AppState, RolegateServer, WebConfig};
use std::sync::{Arc, LazyLock};
use tracing::info;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Seeded user that can log in with a password
pub const PASSWORD_USER: &str = "alice";
pub const PASSWORD: &str = "alice-password";

// Ensure tracing is initialized only once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub state: AppState,
    pub audit: Arc<MemoryAuditSink>,
}

impl TestApp {
    /// Token for a seeded user, issued without a password
    pub fn token_for(&self, username: &str) -> String {
        self.state
            .user_service
            .issue_token(username)
            .expect("Failed to issue token.")
            .access_token
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.api_client.get(format!("{}{}", &self.address, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.api_client.delete(format!("{}{}", &self.address, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn post<Body>(&self, path: &str, token: Option<&str>, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        let mut request = self
            .api_client
            .post(format!("{}{}", &self.address, path))
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn post_login(&self, username: &str, password: &str) -> reqwest::Response {
        self.post(
            "/api/auth/login",
            None,
            &serde_json::json!({ "username": username, "password": password }),
        )
        .await
    }
}

/// Default roles and users plus one password-holding `user`
pub fn test_config() -> GateConfig {
    let mut gate = GateConfig::default();
    let mut alice = UserSeed::new(PASSWORD_USER, Some("user"));
    alice.password_hash = Some(hash_password(PASSWORD).expect("Failed to hash password."));
    gate.users.push(alice);
    gate
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_config(test_config()).await
}

pub async fn spawn_app_with_config(gate: GateConfig) -> TestApp {
    LazyLock::force(&TRACING);

    let audit = Arc::new(MemoryAuditSink::new());
    let config = WebConfig::new(gate).with_secret(TEST_SECRET);
    let state = AppState::with_audit(config, audit.clone()).expect("Failed to build state.");

    let (listener, addr) = RolegateServer::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port.");
    let port = addr.port();
    info!("Test server on port {}", port);

    let app = create_app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        port,
        api_client: reqwest::Client::new(),
        state,
        audit,
    }
}
