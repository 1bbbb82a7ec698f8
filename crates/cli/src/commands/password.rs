//! Password commands.
//!
//! # Usage
//!
//! ```bash
//! # Digest to store in a hand-written users row
//! tiendita-cli hash 'S3cret!pass'
//!
//! # Run the registration policy against a candidate
//! tiendita-cli check-password 'S3cret!pass'
//! ```

use tiendita_core::PasswordDigest;
use tiendita_storefront::services::auth::{PasswordPolicyError, hash_password, validate_password};

/// Digest a password the way the login form does.
pub fn hash(password: &str) -> PasswordDigest {
    let digest = hash_password(password);
    tracing::info!("{}", digest.as_str());
    digest
}

/// Check a password against the registration policy.
///
/// # Errors
///
/// Returns the first policy rule the password breaks.
pub fn check(password: &str) -> Result<(), PasswordPolicyError> {
    validate_password(password)?;
    tracing::info!("Password meets the policy");
    Ok(())
}
