//! Authentication service.
//!
//! Username/password login against the remote `users` table. The password
//! is digested here and only the digest leaves the process.

mod error;
mod password;

pub use error::AuthError;
pub use password::{MIN_PASSWORD_LENGTH, PasswordPolicyError, hash_password, validate_password};

use tracing::{info, instrument, warn};

use tiendita_core::Username;

use crate::backend::{BackendError, UserTable};
use crate::models::{CurrentUser, NewUser};
use crate::services::session::SessionStore;

/// Authentication service.
///
/// Borrowed per request: the user table from application state and the
/// session store from the request.
pub struct AuthService<'a, U: UserTable + ?Sized> {
    users: &'a U,
    session: &'a SessionStore,
}

impl<'a, U: UserTable + ?Sized> AuthService<'a, U> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a U, session: &'a SessionStore) -> Self {
        Self { users, session }
    }

    /// Login with username and password.
    ///
    /// On exactly one matching row the identity is persisted in the session
    /// and returned.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for no match, several matches,
    /// a malformed row or a failed lookup. Returns `AuthError::Session` if the
    /// identity cannot be stored.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let username = Username::parse(username).map_err(|_| AuthError::InvalidCredentials)?;
        let digest = hash_password(password);

        let user = self
            .users
            .find_by_credentials(&username, &digest)
            .await
            .map_err(|e| {
                match e {
                    BackendError::NotSingleRow => {}
                    other => warn!(error = %other, "Credential lookup failed"),
                }
                AuthError::InvalidCredentials
            })?;

        let current = CurrentUser::from(user);
        self.session.persist(&current).await?;

        info!(user_id = %current.id, role = %current.role, "User logged in");
        Ok(current)
    }

    /// Register a customer account.
    ///
    /// Does not check the password policy (callers validate first) and never
    /// signs the new user in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` before any remote call if the
    /// username is malformed, `AuthError::UsernameTaken` on a unique
    /// violation and `AuthError::RegistrationFailed` otherwise.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let username = Username::parse(username)?;
        let user = NewUser::customer(username, hash_password(password));

        match self.users.insert_user(&user).await {
            Ok(created) => {
                info!(user_id = %created.id, "User registered");
                Ok(())
            }
            Err(e) if e.is_unique_violation() => Err(AuthError::UsernameTaken),
            Err(e) => {
                tracing::error!(error = %e, "Registration insert failed");
                sentry::capture_error(&e);
                Err(AuthError::RegistrationFailed)
            }
        }
    }

    /// Sign out: clear the persisted identity and destroy the session.
    pub async fn logout(&self) {
        self.session.clear().await;
    }
}
