//! Password hashing and verification.
//!
//! Argon2id with a per-password random salt, stored as a PHC string.
//! Verification is constant-time with respect to the stored hash.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

/// Hash a password for storage.
pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check a password against a stored PHC hash string.
pub fn verify(password: &str, stored: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(stored)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Burn the cost of one verification against a throwaway hash.
///
/// Called when a login names an unknown user, so the miss path takes
/// about as long as a wrong-password path and response timing does not
/// reveal which usernames exist.
pub fn burn_verification(password: &str) {
    // Well-formed Argon2id PHC string that matches no real password.
    const DECOY_HASH: &str =
        "$argon2id$v=19$m=19456,t=2,p=1$ZGVjb3ktc2FsdA$qXcUkzMV5tF3mQ0J8lYvTAeqWm1dR7pZBgN4oCxs6hk";

    if let Ok(parsed) = PasswordHash::new(DECOY_HASH) {
        let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
    }
}
