//! User domain types.
//!
//! These mirror the remote `users` table. The stored digest is never read
//! back; login matches on it server-side instead.

use serde::{Deserialize, Serialize};

use tiendita_core::{PasswordDigest, Role, UserId, Username};

/// A registered account (remote row without its password column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// Admin or Customer.
    pub role: Role,
}

/// Insert payload for the `users` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: Username,
    #[serde(rename = "password")]
    pub password_digest: PasswordDigest,
    pub role: Role,
}

impl NewUser {
    /// Self-service registrations always create customers.
    #[must_use]
    pub const fn customer(username: Username, password_digest: PasswordDigest) -> Self {
        Self {
            username,
            password_digest,
            role: Role::Customer,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_serializes_wire_columns() {
        let digest = PasswordDigest::from_hex(&"a".repeat(64)).unwrap();
        let user = NewUser::customer(Username::parse("ana").unwrap(), digest);

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["username"], "ana");
        assert_eq!(json["password"], "a".repeat(64));
        assert_eq!(json["role"], "Cliente");
    }

    #[test]
    fn test_user_deserializes_remote_row() {
        let row = r#"{"id":"5f0c3f8e-1b7a-4a65-9a3e-2d6f4c1e9b10","username":"root","role":"Admin"}"#;
        let user: User = serde_json::from_str(row).unwrap();
        assert_eq!(user.username.as_str(), "root");
        assert_eq!(user.role, Role::Admin);
    }
}
