//! Permission System
//!
//! Roles are named bundles of permission identifiers, loaded once at startup
//! and read-only afterwards.

use rolegate_core::{validation_error, GateResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// An atomic capability such as `read`, `write` or `delete`
///
/// Identifiers are not checked against a master list: a permission no role
/// grants is still a valid value, it is simply never allowed.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(String);

impl Permission {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized.is_empty() {
            return Err("Permission identifier cannot be empty".to_string());
        }
        Ok(Permission(normalized))
    }
}

impl TryFrom<String> for Permission {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.0
    }
}

/// Role describes a named set of permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier
    pub name: String,
    /// Permissions attached to the role
    pub permissions: HashSet<Permission>,
}

impl Role {
    pub fn new(name: &str, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            name: name.to_string(),
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn grants(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }
}

/// Static role -> permission mapping
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    roles: HashMap<String, Role>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from the `[roles]` section of the configuration
    pub fn from_config(roles: &BTreeMap<String, Vec<String>>) -> GateResult<Self> {
        let mut table = Self::new();
        for (name, identifiers) in roles {
            let permissions = identifiers
                .iter()
                .map(|id| {
                    id.parse::<Permission>()
                        .map_err(|e| validation_error!(e, format!("roles.{}", name), "authz"))
                })
                .collect::<GateResult<Vec<_>>>()?;
            table.insert_role(Role::new(name, permissions));
        }
        Ok(table)
    }

    /// Insert or replace a role definition
    pub fn insert_role(&mut self, role: Role) {
        self.roles.insert(role.name.clone(), role);
    }

    /// Builder-style variant of [`insert_role`](Self::insert_role)
    pub fn with_role(mut self, role: Role) -> Self {
        self.insert_role(role);
        self
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn contains_role(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Sorted role names
    pub fn role_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.roles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Permissions of `role`, sorted; empty for an unknown role
    pub fn permissions_for(&self, role: &str) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = self
            .roles
            .get(role)
            .map(|r| r.permissions.iter().cloned().collect())
            .unwrap_or_default();
        permissions.sort();
        permissions
    }

    /// Whether `role` grants `permission`, without any identity resolution
    pub fn check_role(&self, role: &str, permission: &Permission) -> bool {
        self.roles
            .get(role)
            .map(|r| r.grants(permission))
            .unwrap_or(false)
    }

    /// Whether any role grants `permission`
    pub fn is_known_permission(&self, permission: &Permission) -> bool {
        self.roles.values().any(|r| r.grants(permission))
    }
}
