//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong username/password, or the lookup could not be completed.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Username rejected before reaching the backend.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] tiendita_core::UsernameError),

    /// Username already registered.
    #[error("username already exists")]
    UsernameTaken,

    /// The insert failed for any other reason.
    #[error("registration failed")]
    RegistrationFailed,

    /// Session state could not be written.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}
