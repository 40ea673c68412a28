//! Key derivation using PBKDF2-HMAC-SHA256
//!
//! Turns the master password and the installation salt into the 32-byte
//! AES-256 session key. Derivation is deterministic: the same password and
//! salt always yield the same key, which is what lets a restarted process
//! read data encrypted in an earlier session.

use std::fmt;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{VaultError, VaultResult};

/// Length of the derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Length of the installation salt in bytes
pub const SALT_LEN: usize = 16;

/// A derived encryption key, zeroed on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Generate a fresh random installation salt
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive the session key from a password and salt
pub fn derive_key(password: &str, salt: &[u8], iterations: u32) -> VaultResult<DerivedKey> {
    if salt.is_empty() {
        return Err(VaultError::Crypto("Key derivation salt is empty".into()));
    }
    if iterations == 0 {
        return Err(VaultError::Crypto(
            "Key derivation needs at least one iteration".into(),
        ));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);

    Ok(DerivedKey { key })
}
