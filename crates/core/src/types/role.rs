//! Access-level role carried by every identity.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a role string is not one of the known roles.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0} (expected Admin or Cliente)")]
pub struct RoleParseError(pub String);

/// Role of an identity, gating which routes are admitted.
///
/// The remote `users` table stores the values `Admin` and `Cliente`; the
/// serde representation matches those wire names so rows deserialize
/// directly. `Customer` is accepted as an alias on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Store staff with access to the product-management panel.
    #[serde(rename = "Admin")]
    Admin,
    /// Regular shopper. Every self-registered identity gets this role.
    #[serde(rename = "Cliente", alias = "Customer")]
    Customer,
}

impl Role {
    /// The value stored in the remote `role` column.
    #[must_use]
    pub const fn as_wire_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Customer => "Cliente",
        }
    }

    /// Default landing path for an identity holding this role.
    #[must_use]
    pub const fn home_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Customer => "/",
        }
    }

    /// Whether this is the administrative role.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "cliente" | "customer" => Ok(Self::Customer),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(
            serde_json::to_string(&Role::Customer).expect("serialize"),
            "\"Cliente\""
        );
        assert_eq!(
            serde_json::to_string(&Role::Admin).expect("serialize"),
            "\"Admin\""
        );
    }

    #[test]
    fn test_role_deserializes_alias() {
        let role: Role = serde_json::from_str("\"Customer\"").expect("alias");
        assert_eq!(role, Role::Customer);
    }

    #[test]
    fn test_role_rejects_unknown_wire_value() {
        assert!(serde_json::from_str::<Role>("\"Superuser\"").is_err());
    }

    #[test]
    fn test_role_from_str_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("customer".parse::<Role>(), Ok(Role::Customer));
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_home_path() {
        assert_eq!(Role::Admin.home_path(), "/admin");
        assert_eq!(Role::Customer.home_path(), "/");
    }
}
