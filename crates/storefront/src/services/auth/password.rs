//! Password digest and complexity policy.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;

use tiendita_core::PasswordDigest;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

static UPPERCASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[A-Z]").expect("Invalid regex"));
static LOWERCASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[a-z]").expect("Invalid regex"));
static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("[0-9]").expect("Invalid regex"));
static SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?]"#).expect("Invalid regex")
});

/// First policy rule a password breaks.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters long")]
    TooShort,
    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("Password must contain at least one number")]
    MissingDigit,
    #[error("Password must contain at least one special character")]
    MissingSpecial,
}

/// SHA-256 of the UTF-8 bytes, as 64 lowercase hex characters.
///
/// Unsalted: the remote `users` table matches on this exact value.
#[must_use]
pub fn hash_password(password: &str) -> PasswordDigest {
    let digest: [u8; 32] = Sha256::digest(password.as_bytes()).into();
    PasswordDigest::from(digest)
}

/// Check a password against the complexity policy.
///
/// Rules are checked in order and the first failure is returned.
///
/// # Errors
///
/// Returns the first [`PasswordPolicyError`] the password triggers.
pub fn validate_password(password: &str) -> Result<(), PasswordPolicyError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordPolicyError::TooShort);
    }
    if !UPPERCASE_RE.is_match(password) {
        return Err(PasswordPolicyError::MissingUppercase);
    }
    if !LOWERCASE_RE.is_match(password) {
        return Err(PasswordPolicyError::MissingLowercase);
    }
    if !DIGIT_RE.is_match(password) {
        return Err(PasswordPolicyError::MissingDigit);
    }
    if !SPECIAL_RE.is_match(password) {
        return Err(PasswordPolicyError::MissingSpecial);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_vectors() {
        assert_eq!(
            hash_password("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hash_password("abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_password("Abc123!@"), hash_password("Abc123!@"));
        assert_ne!(hash_password("Abc123!@"), hash_password("Abc123!#"));
    }

    #[test]
    fn test_hash_is_lowercase_hex() {
        let digest = hash_password("Contraseña1!");
        assert_eq!(digest.as_str().len(), 64);
        assert!(digest.as_str().chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_valid_password() {
        assert_eq!(validate_password("Abc123!@"), Ok(()));
        assert_eq!(validate_password("Sup3r/secret"), Ok(()));
    }

    #[test]
    fn test_rules_in_order() {
        assert_eq!(validate_password("short1!"), Err(PasswordPolicyError::TooShort));
        assert_eq!(validate_password("abc"), Err(PasswordPolicyError::TooShort));
        assert_eq!(validate_password("abc123!@"), Err(PasswordPolicyError::MissingUppercase));
        assert_eq!(validate_password("ABC123!@"), Err(PasswordPolicyError::MissingLowercase));
        assert_eq!(validate_password("Abcdefg!"), Err(PasswordPolicyError::MissingDigit));
        assert_eq!(validate_password("Abcdefg1"), Err(PasswordPolicyError::MissingSpecial));
    }

    #[test]
    fn test_length_counts_characters() {
        // 7 characters, 8+ bytes
        assert_eq!(validate_password("Ñandú1!"), Err(PasswordPolicyError::TooShort));
    }

    #[test]
    fn test_non_ascii_letters_do_not_count() {
        assert_eq!(validate_password("ÁÉÍÓÚ123!"), Err(PasswordPolicyError::MissingUppercase));
    }

    #[test]
    fn test_every_listed_special_character() {
        for c in r#"!@#$%^&*()_+-=[]{};':"\|,.<>/?"#.chars() {
            let password = format!("Abcdef1{c}");
            assert_eq!(validate_password(&password), Ok(()), "rejected {c}");
        }
        assert_eq!(validate_password("Abcdef1~"), Err(PasswordPolicyError::MissingSpecial));
    }
}
