//! Username and password policy.
//!
//! Structural rules credentials must satisfy before an account row is
//! created. Checked before hashing, so a rejected attempt never touches
//! the database.

use thiserror::Error;

/// Minimum accepted username length.
pub const MIN_USERNAME_LEN: usize = 3;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A credential policy violation. The display text is the reason shown
/// to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("username must be at least {} characters", MIN_USERNAME_LEN)]
    UsernameTooShort,

    #[error("username may only contain letters, digits and underscores")]
    UsernameBadChars,

    #[error("password must be at least {} characters", MIN_PASSWORD_LEN)]
    PasswordTooShort,

    #[error("password must contain at least one uppercase letter")]
    PasswordNeedsUppercase,

    #[error("password must contain at least one lowercase letter")]
    PasswordNeedsLowercase,

    #[error("password must contain at least one digit")]
    PasswordNeedsDigit,
}

/// Validate a username against the account policy.
pub fn validate_username(username: &str) -> Result<(), PolicyError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(PolicyError::UsernameTooShort);
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(PolicyError::UsernameBadChars);
    }
    Ok(())
}

/// Validate a password against the account policy.
pub fn validate_password(password: &str) -> Result<(), PolicyError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PolicyError::PasswordTooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PolicyError::PasswordNeedsUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PolicyError::PasswordNeedsLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PolicyError::PasswordNeedsDigit);
    }
    Ok(())
}
