use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{generate_jwt, hash_password_async, verify_password_async, Claims};
use crate::config::SecurityConfig;
use crate::database::models::User;
use crate::database::Store;
use crate::types::{Caller, Region, Role};

use super::error::{ServiceError, ServiceResult};
use super::non_blank;

const MIN_USERNAME_LEN: usize = 6;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterUser {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
    #[serde(skip)]
    pub user: User,
}

/// Account registry plus token issuance
pub struct UserService {
    store: Arc<dyn Store>,
    jwt_secret: String,
    jwt_expiry_secs: u64,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, security: &SecurityConfig) -> Self {
        Self {
            store,
            jwt_secret: security.jwt_secret.clone(),
            jwt_expiry_secs: security.jwt_expiry_secs,
        }
    }

    /// Admin-only account creation
    pub async fn register(&self, caller: &Caller, input: RegisterUser) -> ServiceResult<User> {
        if !caller.is_admin() {
            warn!("Non-admin {} attempted to register a user", caller.id());
            return Err(ServiceError::forbidden("Only admins can register new users"));
        }

        let username = non_blank(input.username).ok_or_else(|| ServiceError::invalid_input("username is required"))?;
        let password = input
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ServiceError::invalid_input("password is required"))?;
        let role: Role = non_blank(input.role)
            .ok_or_else(|| ServiceError::invalid_input("role is required"))?
            .parse()
            .map_err(ServiceError::InvalidInput)?;

        let region = match role {
            Role::Admin => None,
            Role::User => Some(
                non_blank(input.region)
                    .ok_or_else(|| ServiceError::invalid_input("region is required for role user"))?
                    .parse::<Region>()
                    .map_err(ServiceError::InvalidInput)?,
            ),
        };

        let user = self.create_account(&username, &password, role, region).await?;
        info!("User {} ({}) registered by {}", user.username, user.role, caller.id());
        Ok(user)
    }

    /// Verifies credentials and mints a token for the account
    pub async fn login(&self, input: LoginRequest) -> ServiceResult<IssuedToken> {
        let (Some(username), Some(password)) = (non_blank(input.username), input.password) else {
            return Err(ServiceError::invalid_input("Username and password are required"));
        };

        let user = self
            .store
            .find_user_by_username(&username)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        if !verify_password_async(password, user.password_hash.clone()).await {
            warn!("Failed login for {}", username);
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }

        let claims = Claims::for_user(&user, self.jwt_expiry_secs);
        let token = generate_jwt(&claims, &self.jwt_secret)?;

        info!("User {} logged in", user.username);
        Ok(IssuedToken {
            token,
            expires_in: self.jwt_expiry_secs,
            user,
        })
    }

    pub async fn profile(&self, caller: &Caller) -> ServiceResult<User> {
        self.store
            .find_user(caller.id())
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    /// Every account for admins; a regional user sees their own region only
    pub async fn list(&self, caller: &Caller) -> ServiceResult<Vec<User>> {
        Ok(self.store.list_users(caller.region()).await?)
    }

    /// Creates the initial admin when the registry has none. Returns the new
    /// account, or `None` when an admin already exists.
    pub async fn bootstrap_admin(&self, username: &str, password: &str) -> ServiceResult<Option<User>> {
        if self.store.admin_exists().await? {
            return Ok(None);
        }

        let user = self.create_account(username, password, Role::Admin, None).await?;
        info!("Bootstrapped admin account {}", user.username);
        Ok(Some(user))
    }

    /// Validates and stores an account without any caller checks
    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        role: Role,
        region: Option<Region>,
    ) -> ServiceResult<User> {
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(ServiceError::invalid_input(format!(
                "username must be at least {} characters",
                MIN_USERNAME_LEN
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::invalid_input(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if role == Role::User && region.is_none() {
            return Err(ServiceError::invalid_input("region is required for role user"));
        }

        if self.store.find_user_by_username(username).await?.is_some() {
            return Err(ServiceError::conflict("User with this username already exists"));
        }

        let password_hash = hash_password_async(password.to_string()).await?;
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            role,
            region: if role == Role::Admin { None } else { region },
            created_at: Utc::now(),
        };

        Ok(self.store.insert_user(user).await?)
    }
}
