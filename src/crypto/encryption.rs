//! AES-256-GCM encryption/decryption
//!
//! Provides authenticated encryption for data at rest using AES-256-GCM.
//! Each encryption operation generates a unique nonce.
//!
//! Sealed output is a self-contained binary envelope:
//!
//! ```text
//! version (1) || nonce (12) || ciphertext + tag (len + 16)
//! ```
//!
//! The version byte is bound as associated data, so any change to any byte
//! of the envelope is rejected on open.

use std::fmt;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};

use crate::error::{VaultError, VaultResult};

use super::DerivedKey;

/// Current envelope format version
pub const ENVELOPE_VERSION: u8 = 1;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Smallest possible envelope (empty plaintext)
pub const MIN_ENVELOPE_LEN: usize = 1 + NONCE_SIZE + TAG_SIZE;

/// An AES-256-GCM cipher bound to one derived key
pub struct Cipher {
    inner: Aes256Gcm,
}

impl Cipher {
    /// Create a cipher from a derived key
    pub fn new(key: &DerivedKey) -> VaultResult<Self> {
        let inner = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| VaultError::Crypto(format!("Failed to create cipher: {}", e)))?;
        Ok(Self { inner })
    }

    /// Encrypt plaintext into a versioned envelope
    pub fn seal(&self, plaintext: &[u8]) -> VaultResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aad = [ENVELOPE_VERSION];
        let ciphertext = self
            .inner
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|e| VaultError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut envelope = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
        envelope.push(ENVELOPE_VERSION);
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    /// Decrypt a versioned envelope
    ///
    /// Every failure (short input, unknown version, bad tag) is reported as
    /// `DecryptionFailed` so callers cannot tell a wrong key from corruption.
    pub fn open(&self, envelope: &[u8]) -> VaultResult<Vec<u8>> {
        if envelope.len() < MIN_ENVELOPE_LEN || envelope[0] != ENVELOPE_VERSION {
            return Err(VaultError::DecryptionFailed);
        }

        let (nonce_bytes, ciphertext) = envelope[1..].split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.inner
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: &envelope[..1],
                },
            )
            .map_err(|_| VaultError::DecryptionFailed)
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cipher(AES-256-GCM)")
    }
}
