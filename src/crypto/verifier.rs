//! Password verifier using Argon2id
//!
//! The verifier is a slow, salted, one-way hash stored as a PHC string
//! (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`). It only answers "does
//! this password match"; it is never used as key material. Its salt is
//! generated per hash and is unrelated to the key-derivation salt.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::VerifierCost;
use crate::error::{VaultError, VaultResult};

/// Hash a password into a PHC verifier string
pub fn hash_password(password: &str, cost: &VerifierCost) -> VaultResult<String> {
    let params = Params::new(cost.memory_kib, cost.time_cost, cost.parallelism, None)
        .map_err(|e| VaultError::Config(format!("Invalid verifier cost: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| VaultError::Crypto(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Check a password against a PHC verifier string
///
/// The cost parameters embedded in the string are used, so verifiers
/// created under older settings keep working.
pub fn verify_password(password: &str, verifier: &str) -> VaultResult<bool> {
    let parsed = PasswordHash::new(verifier)
        .map_err(|e| VaultError::Config(format!("Corrupt password verifier: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(VaultError::Crypto(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}
