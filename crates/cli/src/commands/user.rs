//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create an administrator (registration only ever creates customers)
//! tiendita-cli user create -u maria -p 'S3cret!pass' -r admin
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_URL` - Base URL of the backend
//! - `BACKEND_ANON_KEY` - API key sent with every request

use thiserror::Error;

use tiendita_core::{Role, RoleParseError, Username, UsernameError};
use tiendita_storefront::backend::{BackendClient, BackendError, UserTable};
use tiendita_storefront::config::{ConfigError, StorefrontConfig};
use tiendita_storefront::models::{NewUser, User};
use tiendita_storefront::services::auth::{PasswordPolicyError, hash_password, validate_password};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    InvalidRole(#[from] RoleParseError),

    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("Weak password: {0}")]
    WeakPassword(#[from] PasswordPolicyError),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Backend error: {0}")]
    Backend(BackendError),
}

/// Validate the inputs into a row ready for insertion.
///
/// # Errors
///
/// Returns the first invalid input.
pub fn new_user(username: &str, password: &str, role: &str) -> Result<NewUser, UserError> {
    let role: Role = role.parse()?;
    let username = Username::parse(username)?;
    validate_password(password)?;

    Ok(NewUser {
        username,
        password_digest: hash_password(password),
        role,
    })
}

/// Insert a user through any user table.
///
/// # Errors
///
/// Returns `UserError::UserExists` when the username is taken.
pub async fn insert<U: UserTable + ?Sized>(users: &U, user: &NewUser) -> Result<User, UserError> {
    users.insert_user(user).await.map_err(|e| {
        if e.is_unique_violation() {
            UserError::UserExists(user.username.to_string())
        } else {
            UserError::Backend(e)
        }
    })
}

/// Create a user on the configured backend.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the inputs are invalid, or
/// the backend rejects the insert.
pub async fn create(username: &str, password: &str, role: &str) -> Result<User, UserError> {
    let new_user = new_user(username, password, role)?;

    let config = StorefrontConfig::from_env()?;
    let client = BackendClient::new(&config.backend).map_err(UserError::Backend)?;

    tracing::info!("Creating user: {} ({})", new_user.username, new_user.role);
    let user = insert(&client, &new_user).await?;

    tracing::info!(
        "User created successfully! ID: {}, Username: {}, Role: {}",
        user.id,
        user.username,
        user.role
    );
    Ok(user)
}
