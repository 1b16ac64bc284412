//! User registry and password authentication

use super::jwt::{AccessToken, AuthError, JwtService};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use rolegate_authz::RoleStore;
use rolegate_core::UserSeed;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// Shortest password accepted at registration
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Default page size for user listings
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page a single listing returns
pub const MAX_PAGE_SIZE: usize = 100;

/// User login request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// User registration request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: String,
}

/// Public user information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub username: String,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One page of users
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPage {
    pub users: Vec<UserInfo>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

/// Internal user data with password hash
#[derive(Debug, Clone)]
pub struct UserData {
    pub username: String,
    /// `None` for token-only users seeded without a password
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserData {
    /// Create new user with hashed password
    pub fn new(username: &str, password: &str, role: &str) -> Result<Self, AuthError> {
        Ok(Self {
            username: username.to_string(),
            password_hash: Some(hash_password(password)?),
            role: Some(role.to_string()),
            created_at: Utc::now(),
        })
    }

    pub fn from_seed(seed: &UserSeed) -> Self {
        Self {
            username: seed.username.clone(),
            password_hash: seed.password_hash.clone(),
            role: seed.role.clone(),
            created_at: Utc::now(),
        }
    }

    /// Verify password; always false for users without a stored hash
    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash
            .as_deref()
            .map(|hash| verify_password(password, hash).unwrap_or(false))
            .unwrap_or(false)
    }

    pub fn to_user_info(&self) -> UserInfo {
        UserInfo {
            username: self.username.clone(),
            role: self.role.clone(),
            created_at: self.created_at,
        }
    }
}

/// In-memory user map shared by the registry and the evaluator
///
/// Writers take the lock only for registration; a poisoned lock makes every
/// lookup come back empty, which the evaluator turns into a deny.
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    users: Arc<RwLock<HashMap<String, UserData>>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: &[UserSeed]) -> Self {
        let users = seeds
            .iter()
            .map(|seed| (seed.username.clone(), UserData::from_seed(seed)))
            .collect();
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    fn read(&self) -> Option<RwLockReadGuard<'_, HashMap<String, UserData>>> {
        match self.users.read() {
            Ok(users) => Some(users),
            Err(_) => {
                warn!("User store lock poisoned, treating every user as unknown");
                None
            }
        }
    }

    pub fn get(&self, username: &str) -> Option<UserData> {
        self.read()?.get(username).cloned()
    }

    pub fn insert(&self, user: UserData) -> Result<(), AuthError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| AuthError::Internal("user store lock poisoned".to_string()))?;

        if users.contains_key(&user.username) {
            return Err(AuthError::UserExists(user.username));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    /// Users sorted by name, then paged
    pub fn page(&self, skip: usize, limit: usize) -> (Vec<UserData>, usize) {
        let Some(users) = self.read() else {
            return (Vec::new(), 0);
        };

        let mut all: Vec<&UserData> = users.values().collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));

        let page = all.into_iter().skip(skip).take(limit).cloned().collect();
        (page, users.len())
    }

    pub fn len(&self) -> usize {
        self.read().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RoleStore for UserStore {
    fn contains(&self, username: &str) -> bool {
        self.read()
            .map(|users| users.contains_key(username))
            .unwrap_or(false)
    }

    fn role_of(&self, username: &str) -> Option<String> {
        self.read()?.get(username)?.role.clone()
    }
}

/// User service for registration, login and token issuing
#[derive(Debug, Clone)]
pub struct UserService {
    store: UserStore,
    jwt: JwtService,
    roles: Arc<BTreeSet<String>>,
}

impl UserService {
    /// `roles` are the role names registration may assign
    pub fn new(
        store: UserStore,
        jwt: JwtService,
        roles: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            store,
            jwt,
            roles: Arc::new(roles.into_iter().collect()),
        }
    }

    /// Register a new user. Hashes the password, so call it off the async runtime.
    pub fn register(&self, request: RegisterRequest) -> Result<UserInfo, AuthError> {
        let username = request.username.trim();
        let role = request.role.trim();
        debug!("Starting user registration for: {}", username);

        if username.is_empty() || request.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
        }
        if !self.roles.contains(role) {
            return Err(AuthError::UnknownRole(role.to_string()));
        }
        if self.store.contains(username) {
            return Err(AuthError::UserExists(username.to_string()));
        }

        let user = UserData::new(username, &request.password, role)?;
        let info = user.to_user_info();
        self.store.insert(user)?;

        info!("User created: {} with role {}", username, role);
        Ok(info)
    }

    /// Check a password and issue a token. Unknown users and wrong passwords
    /// are indistinguishable to the caller.
    pub fn login(&self, request: LoginRequest) -> Result<AccessToken, AuthError> {
        let username = request.username.trim();
        if username.is_empty() || request.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let Some(user) = self.store.get(username) else {
            debug!("Login failed: unknown user {}", username);
            return Err(AuthError::InvalidCredentials);
        };

        if !user.verify_password(&request.password) {
            warn!("Login failed: bad password for {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        self.jwt.generate_token(&user.username)
    }

    /// Issue a token for a known user without a password check
    pub fn issue_token(&self, username: &str) -> Result<AccessToken, AuthError> {
        if !self.store.contains(username) {
            return Err(AuthError::UserNotFound(username.to_string()));
        }
        self.jwt.generate_token(username)
    }

    pub fn list(&self, skip: usize, limit: usize) -> UserPage {
        let limit = limit.min(MAX_PAGE_SIZE);
        let (users, total) = self.store.page(skip, limit);
        UserPage {
            users: users.iter().map(UserData::to_user_info).collect(),
            total,
            skip,
            limit,
        }
    }

    pub fn store(&self) -> &UserStore {
        &self.store
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }
}

/// Hash password using Argon2id with a random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify password against a PHC hash string
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
