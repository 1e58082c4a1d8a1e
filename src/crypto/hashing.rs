//! Master password hashing with Argon2id PHC strings.
//!
//! Hashing embeds a fresh random salt, so two hashes of the same
//! password differ; verification parses the PHC string and re-runs the
//! KDF, comparing in constant time inside the `password_hash` crate.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::errors::{PassVaultError, Result};

/// Hash a master password into a PHC string (`$argon2id$...`).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PassVaultError::HashingFailed(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash.
///
/// Returns `false` both for a wrong password and for an unparseable
/// hash; authentication outcomes are booleans, never errors.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
