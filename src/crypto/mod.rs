//! Cryptographic primitives for portfolio-vault
//!
//! Provides PBKDF2-HMAC-SHA256 key derivation, AES-256-GCM authenticated
//! encryption, the Argon2id password verifier, and zeroising wrappers for
//! secrets held in memory.

pub mod encryption;
pub mod key_derivation;
pub mod secure_memory;
pub mod verifier;

pub use encryption::Cipher;
pub use key_derivation::{derive_key, generate_salt, DerivedKey, KEY_LEN, SALT_LEN};
pub use secure_memory::SecureString;
pub use verifier::{hash_password, verify_password};
