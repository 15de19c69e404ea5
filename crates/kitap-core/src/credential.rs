//! # Credential Module
//!
//! One-way password hashing with Argon2id.
//!
//! ## Format
//! Hashes are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
//! The salt and parameters travel inside the string, so `verify_password`
//! needs nothing but the stored value.
//!
//! ## Salting
//! Every call to [`hash_password`] draws a fresh salt from the OS RNG.
//! Hashing the same password twice yields two different strings, and both
//! verify.
//!
//! Length policy (minimum 8 characters) is the caller's job, see
//! [`crate::validation::validate_password`].

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{CoreError, CoreResult};

/// Hashes a password for storage.
///
/// ## Errors
/// `CoreError::PasswordHash` if the hasher rejects its input (e.g. a
/// password longer than Argon2 accepts). User-chosen passwords of sane
/// length never fail.
pub fn hash_password(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CoreError::PasswordHash {
            reason: e.to_string(),
        })?;

    Ok(hash.to_string())
}

/// Checks a password against a stored hash.
///
/// Returns `false` for a wrong password and for a hash that cannot be
/// parsed; it never panics or errors. The digest comparison inside argon2
/// is constant-time.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================
