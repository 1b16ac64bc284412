//! Configuration management
//!
//! Everything the gate needs at startup comes from one TOML artifact:
//! server address, token lifetime, the role -> permission table and the
//! seeded users. Secrets are never read from the file.

use crate::error::GateResult;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variables consulted for the token signing secret, in order
pub const SECRET_ENV_VARS: [&str; 3] = ["ROLEGATE_JWT_SECRET", "JWT_SECRET", "SECRET_KEY"];

/// Longest accepted token lifetime: one year
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Role name -> permission identifiers
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,
    /// Identities known at startup
    #[serde(default)]
    pub users: Vec<UserSeed>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allows starting without a configured secret
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
        }
    }
}

/// Token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of issued access tokens
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_minutes: 60,
        }
    }
}

impl AuthConfig {
    /// Read the signing secret from the environment
    pub fn secret_from_env() -> Option<String> {
        SECRET_ENV_VARS.iter().find_map(|name| {
            std::env::var(name)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .inspect(|_| debug!("Using token secret from {}", name))
        })
    }
}

/// A user declared in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSeed {
    pub username: String,
    /// `None` declares an identity without a role
    #[serde(default)]
    pub role: Option<String>,
    /// Argon2 PHC string; users without one cannot log in with a password
    #[serde(default)]
    pub password_hash: Option<String>,
}

impl UserSeed {
    pub fn new(username: &str, role: Option<&str>) -> Self {
        Self {
            username: username.to_string(),
            role: role.map(str::to_string),
            password_hash: None,
        }
    }
}

/// Where [`GateConfig::load_or_default`] takes its configuration from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file at this path
    Defaults(PathBuf),
}

impl ConfigSource {
    pub fn locate(path: &Path) -> Self {
        if path.exists() {
            ConfigSource::File(path.to_path_buf())
        } else {
            ConfigSource::Defaults(path.to_path_buf())
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "configuration from {}", path.display()),
            ConfigSource::Defaults(path) => write!(
                f,
                "built-in defaults (no configuration at {})",
                path.display()
            ),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        let mut roles = BTreeMap::new();
        roles.insert(
            "admin".to_string(),
            vec![
                "read".to_string(),
                "write".to_string(),
                "delete".to_string(),
                "manage_users".to_string(),
            ],
        );
        roles.insert("user".to_string(), vec!["read".to_string()]);

        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            roles,
            users: vec![
                UserSeed::new("user1", Some("admin")),
                UserSeed::new("user2", Some("user")),
            ],
            logging: LoggingConfig::default(),
        }
    }
}

impl GateConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> GateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::config_error!(
                format!("Failed to read config file {}: {}", path.display(), e),
                "config",
                "read_file",
                e
            )
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> GateResult<Self> {
        let config: GateConfig = toml::from_str(content).map_err(|e| {
            crate::config_error!(
                format!("Failed to parse config: {}", e),
                "config",
                "parse_toml",
                e
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to the built-in defaults
    ///
    /// Nothing is logged here: this runs before logging is set up. Report
    /// [`ConfigSource::locate`] once it is.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> GateResult<Self> {
        match ConfigSource::locate(path.as_ref()) {
            ConfigSource::File(path) => Self::from_file(path),
            ConfigSource::Defaults(_) => Ok(Self::default()),
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> GateResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::config_error!(
                format!("Failed to serialize config: {}", e),
                "config",
                "serialize_toml",
                e
            )
        })?;

        std::fs::write(path, content).map_err(|e| {
            crate::config_error!(
                format!("Failed to write config file: {}", e),
                "config",
                "write_file",
                e
            )
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> GateResult<()> {
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&self.auth.token_ttl_minutes) {
            return Err(crate::validation_error!(
                format!(
                    "auth.token_ttl_minutes must be between 1 and {}",
                    MAX_TOKEN_TTL_MINUTES
                ),
                "auth.token_ttl_minutes",
                "config"
            ));
        }

        for (role, permissions) in &self.roles {
            if role.trim().is_empty() {
                return Err(crate::validation_error!(
                    "Role name cannot be empty",
                    "roles",
                    "config"
                ));
            }
            if permissions.iter().any(|p| p.trim().is_empty()) {
                return Err(crate::validation_error!(
                    format!("Role '{}' declares an empty permission", role),
                    format!("roles.{}", role),
                    "config"
                ));
            }
        }

        let mut seen = HashSet::new();
        for user in &self.users {
            if user.username.trim().is_empty() {
                return Err(crate::validation_error!(
                    "Username cannot be empty",
                    "users.username",
                    "config"
                ));
            }
            if !seen.insert(user.username.as_str()) {
                return Err(crate::validation_error!(
                    format!("User '{}' is declared more than once", user.username),
                    "users.username",
                    "config"
                ));
            }
            if let Some(role) = &user.role {
                if !self.roles.contains_key(role) {
                    return Err(crate::validation_error!(
                        format!(
                            "User '{}' references undefined role '{}'",
                            user.username, role
                        ),
                        "users.role",
                        "config"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Find a seeded user by name
    pub fn user(&self, username: &str) -> Option<&UserSeed> {
        self.users.iter().find(|u| u.username == username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GateError;

    #[test]
    fn test_default_config_is_valid() {
        let config = GateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.roles["user"], vec!["read".to_string()]);
        assert_eq!(
            config.user("user1").and_then(|u| u.role.as_deref()),
            Some("admin")
        );
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = GateConfig::from_toml_str(
            r#"
            [roles]
            editor = ["read", "write"]

            [[users]]
            username = "alice"
            role = "editor"

            [[users]]
            username = "nobody"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_ttl_minutes, 60);
        assert_eq!(config.roles.len(), 1);
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.user("nobody").unwrap().role, None);
    }

    #[test]
    fn test_rejects_undefined_role() {
        let result = GateConfig::from_toml_str(
            r#"
            [roles]
            user = ["read"]

            [[users]]
            username = "bob"
            role = "admin"
            "#,
        );

        assert!(matches!(result, Err(GateError::Validation { .. })));
    }

    #[test]
    fn test_rejects_empty_role_name_and_permission() {
        let mut config = GateConfig::default();
        config.roles.insert(" ".to_string(), vec!["read".to_string()]);
        assert!(config.validate().is_err());

        let mut config = GateConfig::default();
        config
            .roles
            .insert("broken".to_string(), vec!["".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_users() {
        let mut config = GateConfig::default();
        config.users.push(UserSeed::new("user1", Some("user")));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_ttl_bounds() {
        let mut config = GateConfig::default();
        config.auth.token_ttl_minutes = 0;
        assert!(config.validate().is_err());

        config.auth.token_ttl_minutes = MAX_TOKEN_TTL_MINUTES;
        assert!(config.validate().is_ok());

        for ttl in [MAX_TOKEN_TTL_MINUTES + 1, 10_000_000_000_000, i64::MAX] {
            config.auth.token_ttl_minutes = ttl;
            assert!(matches!(
                config.validate(),
                Err(GateError::Validation { .. })
            ));
        }
    }

    #[test]
    fn test_config_source() {
        let missing = Path::new("no/such/rolegate.toml");
        let source = ConfigSource::locate(missing);
        assert_eq!(source, ConfigSource::Defaults(missing.to_path_buf()));
        assert!(source.to_string().starts_with("built-in defaults"));

        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
        let source = ConfigSource::locate(&manifest);
        assert_eq!(source, ConfigSource::File(manifest.clone()));
        assert_eq!(
            source.to_string(),
            format!("configuration from {}", manifest.display())
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = GateConfig::from_toml_str("[roles\nadmin = ");
        match result {
            Err(GateError::Config { context, .. }) => {
                assert_eq!(context.operation.as_deref(), Some("parse_toml"));
                assert!(!context.suggestions.is_empty());
            }
            other => panic!("Expected Config error, got {:?}", other.map(|_| ())),
        }
    }
}
