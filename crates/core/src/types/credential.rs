//! Password digest type.
//!
//! Type-safe wrapper for the hex digest stored in the remote identity table.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PasswordDigest`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The input has the wrong number of characters.
    #[error("digest must be {expected} hex characters (got {actual})")]
    Length {
        /// Required length.
        expected: usize,
        /// Length of the input.
        actual: usize,
    },
    /// The input contains characters outside `0-9a-f`.
    #[error("digest must be lowercase hexadecimal")]
    NotLowercaseHex,
}

/// Lowercase hex rendering of a 256-bit password digest.
///
/// Anyone holding this value can authenticate against the identity table, so
/// `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Number of hex characters in a digest.
    pub const HEX_LENGTH: usize = 64;

    /// Parse a digest from its hex rendering.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is exactly 64 lowercase hex characters.
    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        if s.len() != Self::HEX_LENGTH {
            return Err(DigestError::Length {
                expected: Self::HEX_LENGTH,
                actual: s.len(),
            });
        }

        if !s
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(DigestError::NotLowercaseHex);
        }

        Ok(Self(s.to_owned()))
    }

    /// Get the hex rendering.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<[u8; 32]> for PasswordDigest {
    fn from(bytes: [u8; 32]) -> Self {
        use fmt::Write;

        let mut hex = String::with_capacity(Self::HEX_LENGTH);
        for b in bytes {
            let _ = write!(hex, "{b:02x}");
        }
        Self(hex)
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest([REDACTED])")
    }
}
