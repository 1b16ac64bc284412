//! Application state
//!
//! Everything the evaluator needs is built here once, from configuration,
//! and injected; handlers only ever see the shared `AppState`.

use crate::{
    auth::{JwtService, UserService, UserStore},
    WebConfig, WebError, WebResult,
};
use rand::{distributions::Alphanumeric, Rng};
use rolegate_authz::{AuditSink, PermissionEvaluator, PermissionTable, TracingAuditSink};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Length of the secret generated in dev mode
const DEV_SECRET_LENGTH: usize = 48;

/// Documents kept by `/api/write`; the oldest is dropped past this
pub const MAX_STORED_RECORDS: usize = 1000;

#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<WebConfig>,
    /// Shared permission evaluator
    pub evaluator: Arc<PermissionEvaluator>,
    /// Registration, login and token issuing
    pub user_service: UserService,
    /// Documents stored through `/api/write`, at most [`MAX_STORED_RECORDS`]
    pub records: Arc<RwLock<VecDeque<Value>>>,
}

impl AppState {
    /// Build state with audit records going to the log
    pub fn new(config: WebConfig) -> WebResult<Self> {
        Self::with_audit(config, Arc::new(TracingAuditSink))
    }

    pub fn with_audit(config: WebConfig, audit: Arc<dyn AuditSink>) -> WebResult<Self> {
        let gate = &config.gate;
        gate.validate()?;

        let table = PermissionTable::from_config(&gate.roles)?;
        let secret = resolve_secret(&config)?;
        let jwt = JwtService::new(secret.as_bytes(), gate.auth.token_ttl_minutes)
            .map_err(|e| WebError::Config(e.to_string()))?;

        let store = UserStore::from_seeds(&gate.users);
        let user_service = UserService::new(
            store.clone(),
            jwt.clone(),
            table.role_names().into_iter().map(str::to_string),
        );

        info!(
            "Loaded {} roles and {} users",
            table.role_names().len(),
            store.len()
        );

        let evaluator = PermissionEvaluator::new(table, Arc::new(jwt), Arc::new(store), audit);

        Ok(Self {
            config: Arc::new(config),
            evaluator: Arc::new(evaluator),
            user_service,
            records: Arc::new(RwLock::new(VecDeque::new())),
        })
    }

    /// Append a document, evicting the oldest when full. Returns the count kept.
    pub async fn store_record(&self, record: Value) -> usize {
        let mut records = self.records.write().await;
        if records.len() >= MAX_STORED_RECORDS {
            records.pop_front();
        }
        records.push_back(record);
        records.len()
    }

    /// Drop every stored document, returning how many there were
    pub async fn clear_records(&self) -> usize {
        let mut records = self.records.write().await;
        let removed = records.len();
        records.clear();
        removed
    }
}

fn resolve_secret(config: &WebConfig) -> WebResult<String> {
    if let Some(secret) = config.jwt_secret.as_ref().filter(|s| !s.trim().is_empty()) {
        return Ok(secret.clone());
    }

    if config.gate.server.dev_mode {
        warn!("No token secret configured; generated a random one for this dev session");
        return Ok(rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(DEV_SECRET_LENGTH)
            .map(char::from)
            .collect());
    }

    Err(WebError::Config(
        "No token secret: set ROLEGATE_JWT_SECRET or enable dev_mode".to_string(),
    ))
}
