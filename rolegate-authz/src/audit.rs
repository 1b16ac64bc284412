//! Audit trail for authorization decisions
//!
//! Every grant and every denial produces one [`AuditRecord`]. Sinks are
//! fire-and-forget: recording can never block or alter a decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Log target used for audit events
pub const AUDIT_TARGET: &str = "rolegate::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Allow,
    Deny,
}

impl std::fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditOutcome::Allow => write!(f, "allow"),
            AuditOutcome::Deny => write!(f, "deny"),
        }
    }
}

/// One authorization decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    /// Resolved username, if resolution got that far
    pub identity: Option<String>,
    /// Requested permission as received
    pub permission: String,
    pub outcome: AuditOutcome,
    /// Deny reason; `None` for grants
    pub reason: Option<String>,
}

impl AuditRecord {
    pub fn allow(identity: &str, permission: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            identity: Some(identity.to_string()),
            permission: permission.to_string(),
            outcome: AuditOutcome::Allow,
            reason: None,
        }
    }

    pub fn deny(identity: Option<&str>, permission: &str, reason: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            identity: identity.map(str::to_string),
            permission: permission.to_string(),
            outcome: AuditOutcome::Deny,
            reason: Some(reason.to_string()),
        }
    }
}

/// Receives audit records
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Emits audit records as `tracing` events on [`AUDIT_TARGET`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        let identity = record.identity.as_deref().unwrap_or("-");
        match record.outcome {
            AuditOutcome::Allow => info!(
                target: AUDIT_TARGET,
                identity,
                permission = %record.permission,
                outcome = %record.outcome,
                "Access granted"
            ),
            AuditOutcome::Deny => warn!(
                target: AUDIT_TARGET,
                identity,
                permission = %record.permission,
                outcome = %record.outcome,
                reason = record.reason.as_deref().unwrap_or("unspecified"),
                "Access denied"
            ),
        }
    }
}

/// Forwards records to a bounded channel, dropping them when it is full
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::Sender<AuditRecord>,
}

impl ChannelAuditSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditRecord>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl AuditSink for ChannelAuditSink {
    fn record(&self, record: AuditRecord) {
        match self.sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                debug!(
                    permission = %dropped.permission,
                    "Audit channel full, dropping record"
                );
            }
            Err(TrySendError::Closed(dropped)) => {
                debug!(
                    permission = %dropped.permission,
                    "Audit channel closed, dropping record"
                );
            }
        }
    }
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: AuditRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }
}

/// Sends each record to every inner sink
#[derive(Clone, Default)]
pub struct FanoutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanoutAuditSink {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl AuditSink for FanoutAuditSink {
    fn record(&self, record: AuditRecord) {
        for sink in &self.sinks {
            sink.record(record.clone());
        }
    }
}
