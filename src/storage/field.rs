//! Encrypted-field adapter
//!
//! Sits at the persistence boundary and turns structured values into the
//! string stored in a "may be sensitive" column, and back.
//!
//! Writing: with an active session the JSON text is encrypted and stored as
//! lowercase hex; without one it is stored as plain JSON text. Callers that
//! must not write sensitive data in the clear are responsible for checking
//! `SessionManager::is_authenticated` first.
//!
//! Reading falls through three tiers and never fails:
//!
//! 1. session active: hex-decode, decrypt, parse ([`FieldSource::Decrypted`])
//! 2. parse as plain JSON ([`FieldSource::PlainJson`])
//! 3. the raw string itself ([`FieldSource::Raw`])
//!
//! This keeps rows written before a password was set readable. The price is
//! that corrupted ciphertext reads back as "not encrypted"; such reads set
//! [`DecodedField::decrypt_failed`] and log a warning.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::json_text::to_field_text;
use crate::auth::SessionManager;
use crate::crypto::encryption::MIN_ENVELOPE_LEN;
use crate::error::{VaultError, VaultResult};

/// Which tier produced a decoded value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Decrypted under the current session
    Decrypted,
    /// Parsed as plaintext JSON
    PlainJson,
    /// Neither; the stored string is returned as-is
    Raw,
}

/// Result of decoding a stored field
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    /// The logical value
    pub value: Value,
    /// Which tier produced it
    pub source: FieldSource,
    /// The stored text looked like ciphertext but did not authenticate
    pub decrypt_failed: bool,
}

impl DecodedField {
    fn new(value: Value, source: FieldSource) -> Self {
        Self {
            value,
            source,
            decrypt_failed: false,
        }
    }
}

/// Encodes and decodes field values through a session
#[derive(Clone, Copy)]
pub struct FieldCodec<'a> {
    session: &'a SessionManager,
}

impl<'a> FieldCodec<'a> {
    /// Create a codec that encrypts through `session`
    pub fn new(session: &'a SessionManager) -> Self {
        Self { session }
    }

    /// Convert a value to its stored string
    pub fn encode_field<T: Serialize + ?Sized>(&self, value: &T) -> VaultResult<String> {
        let text = to_field_text(value)?;

        if !self.session.is_authenticated() {
            return Ok(text);
        }

        match self.session.encrypt(text.as_bytes()) {
            Ok(sealed) => Ok(hex::encode(sealed)),
            // Expired between the check and the encryption
            Err(VaultError::NotAuthenticated) => Ok(text),
            Err(e) => Err(e),
        }
    }

    /// Convert a stored string back to a value
    pub fn decode_field(&self, stored: &str) -> DecodedField {
        let mut decrypt_failed = false;

        if self.session.is_authenticated() {
            if let Ok(sealed) = hex::decode(stored) {
                match self.session.decrypt(&sealed) {
                    Ok(plaintext) => {
                        if let Some(value) = parse_plaintext(plaintext) {
                            return DecodedField::new(value, FieldSource::Decrypted);
                        }
                        decrypt_failed = true;
                    }
                    Err(VaultError::DecryptionFailed) if sealed.len() >= MIN_ENVELOPE_LEN => {
                        decrypt_failed = true;
                    }
                    Err(_) => {}
                }
            }
        }

        if decrypt_failed {
            warn!(
                len = stored.len(),
                "Stored field looks encrypted but did not decrypt; reading it as plaintext"
            );
        }

        let mut decoded = match serde_json::from_str::<Value>(stored) {
            Ok(value) => DecodedField::new(value, FieldSource::PlainJson),
            Err(_) => DecodedField::new(Value::String(stored.to_string()), FieldSource::Raw),
        };
        decoded.decrypt_failed = decrypt_failed;
        decoded
    }

    /// Decode a stored field into a concrete type
    pub fn decode_field_as<T: DeserializeOwned>(&self, stored: &str) -> VaultResult<T> {
        let decoded = self.decode_field(stored);
        serde_json::from_value(decoded.value).map_err(VaultError::from)
    }
}

/// Decrypted bytes are JSON text; older rows may hold an unquoted string
fn parse_plaintext(plaintext: Vec<u8>) -> Option<Value> {
    if let Ok(value) = serde_json::from_slice::<Value>(&plaintext) {
        return Some(value);
    }
    String::from_utf8(plaintext).ok().map(Value::String)
}
