//! Per-request access to the persisted identity.
//!
//! Wraps the `tower-sessions` session under the fixed key `user`. Handlers
//! receive a fresh [`SessionStore`] per request; there is no global
//! authentication state.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;
use tracing::warn;

use crate::models::session::keys;
use crate::models::{CurrentUser, SessionState};

/// The current browser session's identity slot.
#[derive(Clone, Debug)]
pub struct SessionStore {
    session: Session,
}

impl SessionStore {
    /// Wrap a session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Read the persisted identity.
    ///
    /// A malformed value is logged, removed and treated as anonymous. Storage
    /// errors are logged and treated as anonymous.
    pub async fn restore(&self) -> SessionState {
        let value = match self.session.get_value(keys::USER).await {
            Ok(Some(value)) => value,
            Ok(None) => return SessionState::Anonymous,
            Err(e) => {
                warn!(error = %e, "Failed to read session");
                return SessionState::Anonymous;
            }
        };

        match serde_json::from_value::<CurrentUser>(value) {
            Ok(user) => SessionState::Authenticated(user),
            Err(e) => {
                warn!(error = %e, "Discarding malformed session identity");
                if let Err(e) = self.session.remove_value(keys::USER).await {
                    warn!(error = %e, "Failed to remove malformed session identity");
                }
                SessionState::Anonymous
            }
        }
    }

    /// Persist the identity after a successful login.
    ///
    /// The session id is rotated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn persist(&self, user: &CurrentUser) -> Result<(), tower_sessions::session::Error> {
        self.session.cycle_id().await?;
        self.session.insert(keys::USER, user).await
    }

    /// Remove the identity and destroy the session record.
    ///
    /// Never fails; storage errors are logged.
    pub async fn clear(&self) {
        if let Err(e) = self.session.remove_value(keys::USER).await {
            warn!(error = %e, "Failed to remove session identity");
        }
        if let Err(e) = self.session.flush().await {
            warn!(error = %e, "Failed to destroy session");
        }
    }

    /// Key identifying this browser session's owner for the in-flight
    /// registry: the user id when signed in, otherwise the session id.
    ///
    /// A visitor without a stored session gets a one-off key.
    pub async fn owner_key(&self) -> String {
        if let SessionState::Authenticated(user) = self.restore().await {
            return format!("user:{}", user.id);
        }
        self.session.id().map_or_else(
            || format!("visitor:{}", uuid::Uuid::new_v4()),
            |id| format!("session:{id}"),
        )
    }
}

impl<S> FromRequestParts<S> for SessionStore
where
    S: Send + Sync,
{
    type Rejection = <Session as FromRequestParts<S>>::Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state).await.map(Self::new)
    }
}
