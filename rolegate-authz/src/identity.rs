//! Identity resolution and role lookup
//!
//! Two collaborators sit in front of the evaluator: an [`IdentitySource`]
//! that turns an opaque credential into a username, and a [`RoleStore`]
//! that knows which users exist and which role each one holds.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The authenticated actor of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    /// At most one role per identity
    pub role: Option<String>,
}

impl Identity {
    pub fn new(username: &str, role: Option<&str>) -> Self {
        Self {
            username: username.to_string(),
            role: role.map(str::to_string),
        }
    }
}

/// Why a credential could not be turned into a known identity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("no credential supplied")]
    Missing,
    #[error("credential is malformed")]
    Malformed,
    #[error("credential has expired")]
    Expired,
    #[error("credential signature is invalid")]
    InvalidSignature,
    #[error("user '{0}' is not known")]
    UnknownUser(String),
}

/// Turns an opaque credential into a username
///
/// Implementations must be cheap and non-suspending; verifying a signature
/// is fine, network calls are not.
pub trait IdentitySource: Send + Sync {
    fn resolve(&self, token: &str) -> Result<String, IdentityError>;
}

/// Treats the credential itself as the username
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectIdentitySource;

impl IdentitySource for DirectIdentitySource {
    fn resolve(&self, token: &str) -> Result<String, IdentityError> {
        let username = token.trim();
        if username.is_empty() {
            return Err(IdentityError::Malformed);
        }
        Ok(username.to_string())
    }
}

/// Knows which users exist and which role each one holds
pub trait RoleStore: Send + Sync {
    /// Whether `username` is a known identity
    fn contains(&self, username: &str) -> bool;

    /// Role held by `username`; `None` for unknown users and users without a role
    fn role_of(&self, username: &str) -> Option<String>;
}

/// Immutable username -> role map, built once at startup
#[derive(Debug, Clone, Default)]
pub struct StaticRoleStore {
    users: HashMap<String, Option<String>>,
}

impl StaticRoleStore {
    pub fn new(identities: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            users: identities
                .into_iter()
                .map(|identity| (identity.username, identity.role))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl RoleStore for StaticRoleStore {
    fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    fn role_of(&self, username: &str) -> Option<String> {
        self.users.get(username).cloned().flatten()
    }
}

impl From<&rolegate_core::GateConfig> for StaticRoleStore {
    fn from(config: &rolegate_core::GateConfig) -> Self {
        Self::new(
            config
                .users
                .iter()
                .map(|seed| Identity::new(&seed.username, seed.role.as_deref())),
        )
    }
}
