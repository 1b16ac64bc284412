//! Permission Evaluator
//!
//! `authorize(token, permission)` walks identity -> role -> permission set
//! and returns a [`Decision`]. There is no error path: anything that fails
//! along the way is a deny with a reason, and every decision is audited.

use super::audit::{AuditRecord, AuditSink};
use super::identity::{IdentityError, IdentitySource, RoleStore};
use super::permissions::{Permission, PermissionTable};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// What an allowed request is entitled to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub username: String,
    pub role: String,
    pub permission: Permission,
}

/// Internal reason behind a deny; never shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenyReason {
    #[error("identity unresolved: {0}")]
    IdentityUnresolved(#[from] IdentityError),
    #[error("user '{username}' has no role")]
    RoleUnmapped { username: String },
    #[error("role '{role}' of user '{username}' does not grant '{permission}'")]
    PermissionNotGranted {
        username: String,
        role: String,
        permission: String,
    },
}

impl DenyReason {
    /// Username, when resolution got far enough to know it
    pub fn username(&self) -> Option<&str> {
        match self {
            DenyReason::IdentityUnresolved(IdentityError::UnknownUser(username)) => Some(username),
            DenyReason::IdentityUnresolved(_) => None,
            DenyReason::RoleUnmapped { username } => Some(username),
            DenyReason::PermissionNotGranted { username, .. } => Some(username),
        }
    }
}

/// Outcome of one authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Grant),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn grant(&self) -> Option<&Grant> {
        match self {
            Decision::Allow(grant) => Some(grant),
            Decision::Deny(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&DenyReason> {
        match self {
            Decision::Allow(_) => None,
            Decision::Deny(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<Grant, DenyReason> {
        match self {
            Decision::Allow(grant) => Ok(grant),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Evaluates permission checks against injected, read-only tables
///
/// Cheap to share: wrap in an `Arc` and call `authorize` from any thread.
#[derive(Clone)]
pub struct PermissionEvaluator {
    table: Arc<PermissionTable>,
    identities: Arc<dyn IdentitySource>,
    roles: Arc<dyn RoleStore>,
    audit: Arc<dyn AuditSink>,
}

impl PermissionEvaluator {
    pub fn new(
        table: PermissionTable,
        identities: Arc<dyn IdentitySource>,
        roles: Arc<dyn RoleStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            table: Arc::new(table),
            identities,
            roles,
            audit,
        }
    }

    /// Decide whether the holder of `token` may use `permission`
    ///
    /// `None` or a blank token is a missing credential.
    pub fn authorize(&self, token: Option<&str>, permission: &str) -> Decision {
        let decision = self.evaluate(token, permission);

        let record = match &decision {
            Decision::Allow(grant) => AuditRecord::allow(&grant.username, permission),
            Decision::Deny(reason) => {
                AuditRecord::deny(reason.username(), permission, &reason.to_string())
            }
        };
        self.audit.record(record);

        decision
    }

    fn evaluate(&self, token: Option<&str>, permission: &str) -> Decision {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Decision::Deny(IdentityError::Missing.into());
        };

        let username = match self.identities.resolve(token) {
            Ok(username) => username,
            Err(e) => {
                debug!("Identity resolution failed: {}", e);
                return Decision::Deny(e.into());
            }
        };

        if !self.roles.contains(&username) {
            return Decision::Deny(IdentityError::UnknownUser(username).into());
        }

        let Some(role) = self.roles.role_of(&username) else {
            return Decision::Deny(DenyReason::RoleUnmapped { username });
        };

        // Unparseable and unknown permissions both fall through to a plain deny
        match permission.parse::<Permission>() {
            Ok(required) if self.table.check_role(&role, &required) => Decision::Allow(Grant {
                username,
                role,
                permission: required,
            }),
            _ => Decision::Deny(DenyReason::PermissionNotGranted {
                username,
                role,
                permission: permission.to_string(),
            }),
        }
    }

    /// Role-only check, no identity resolution and no audit record
    pub fn check_role(&self, role: &str, permission: &str) -> bool {
        permission
            .parse::<Permission>()
            .map(|p| self.table.check_role(role, &p))
            .unwrap_or(false)
    }

    /// Permissions currently held by `username`; empty when unknown or unmapped
    pub fn permissions_of(&self, username: &str) -> Vec<Permission> {
        self.roles
            .role_of(username)
            .map(|role| self.table.permissions_for(&role))
            .unwrap_or_default()
    }

    pub fn table(&self) -> &PermissionTable {
        &self.table
    }
}

impl std::fmt::Debug for PermissionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionEvaluator")
            .field("roles", &self.table.role_names())
            .finish_non_exhaustive()
    }
}
