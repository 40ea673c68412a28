//! Custom error types for portfolio-vault
//!
//! This module defines the error hierarchy for the security core using
//! thiserror for ergonomic error definitions.

use thiserror::Error;

/// The main error type for vault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// Password does not satisfy the strength policy
    #[error("Password is too weak: {0}")]
    WeakPassword(String),

    /// No credential file exists yet
    #[error("No master password has been set up")]
    NoCredentials,

    /// Password did not match the stored verifier
    #[error("Invalid password")]
    InvalidPassword,

    /// An operation required an active session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Authentication tag did not verify or the envelope was malformed
    #[error("Decryption failed: invalid key or corrupted data")]
    DecryptionFailed,

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Key derivation or cipher construction faults
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Backup errors
    #[error("Backup error: {0}")]
    Backup(String),
}

impl VaultError {
    /// Check if this error means the caller must log in first
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }

    /// Check if this is a password problem the user can correct by retrying
    pub fn is_password_error(&self) -> bool {
        matches!(self, Self::WeakPassword(_) | Self::InvalidPassword)
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for vault operations
pub type VaultResult<T> = Result<T, VaultError>;
