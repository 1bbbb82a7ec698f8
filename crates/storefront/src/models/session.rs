//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use tiendita_core::{Role, UserId, Username};

use super::user::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's remote ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// Role used by the route guard.
    pub role: Role,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// Authentication state of a browser session.
///
/// `Restoring` only exists between the request arriving and the persisted
/// identity being read; guards render a loading view for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Restoring,
    Anonymous,
    Authenticated(CurrentUser),
}

impl SessionState {
    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&CurrentUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Restoring | Self::Anonymous => None,
        }
    }

    /// Whether the persisted identity has been read.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Restoring)
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const USER: &str = "user";
}
