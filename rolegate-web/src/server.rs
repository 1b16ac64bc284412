//! Rolegate Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use rolegate_core::GateConfig;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Main Rolegate web server
pub struct RolegateServer {
    config: WebConfig,
    state: AppState,
}

impl RolegateServer {
    pub fn new(config: WebConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Bind the configured address and serve until Ctrl+C or SIGTERM
    pub async fn start(self) -> WebResult<()> {
        let listener = TcpListener::bind(self.config.address())
            .await
            .map_err(WebError::Server)?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> WebResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = listener.local_addr().map_err(WebError::Server)?;

        info!("Starting Rolegate server");
        info!("Development mode: {}", self.config.gate.server.dev_mode);
        info!("Server listening on http://{}", address);

        let app = create_app(self.state);

        if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown).await {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        info!("Server stopped");
        Ok(())
    }

    /// Bind to `address` (port 0 picks a free port) and return it
    pub async fn bind(address: &str) -> WebResult<(TcpListener, SocketAddr)> {
        let listener = TcpListener::bind(address).await?;
        let local = listener.local_addr()?;
        Ok((listener, local))
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}

/// Builder for RolegateServer
pub struct RolegateServerBuilder {
    config: WebConfig,
}

impl RolegateServerBuilder {
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
        }
    }

    /// Start from a loaded configuration
    pub fn gate_config(mut self, gate: GateConfig) -> Self {
        self.config.gate = gate;
        self
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.gate.server.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.gate.server.port = port;
        self
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.gate.server.dev_mode = dev_mode;
        self
    }

    pub fn jwt_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.config.jwt_secret = Some(secret.into());
        self
    }

    /// Build the server
    pub fn build(self) -> WebResult<RolegateServer> {
        RolegateServer::new(self.config)
    }
}

impl Default for RolegateServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
