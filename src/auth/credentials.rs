//! Credential store
//!
//! Persists the master password verifier and the key-derivation salt in a
//! small owner-only JSON file. The password itself, or anything it could
//! be recovered from, is never written.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Settings, VaultPaths, VerifierCost};
use crate::crypto::{generate_salt, hash_password, verify_password};
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::{read_json_required, write_new_atomic, FileMode};

/// Current credential file schema version
pub const CREDENTIAL_SCHEMA_VERSION: u32 = 1;

/// On-disk credential record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// PHC string of the slow password hash
    pub password_hash: String,
    /// Key-derivation salt (base64). Never changes after first run.
    pub salt: String,
    /// When the master password was set
    pub created_at: DateTime<Utc>,
    /// Schema version
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    CREDENTIAL_SCHEMA_VERSION
}

impl CredentialRecord {
    /// Decode the stored salt
    pub fn decode_salt(&self) -> VaultResult<Vec<u8>> {
        let salt = STANDARD
            .decode(&self.salt)
            .map_err(|e| VaultError::Config(format!("Invalid salt encoding: {}", e)))?;
        if salt.is_empty() {
            return Err(VaultError::Config("Stored salt is empty".into()));
        }
        Ok(salt)
    }
}

/// Reads and writes the credential file
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    min_length: usize,
    cost: VerifierCost,
}

impl CredentialStore {
    /// Create a store for the credential file under `paths`
    pub fn new(paths: &VaultPaths, settings: &Settings) -> Self {
        Self::with_path(paths.credentials_file(), settings)
    }

    /// Create a store for an explicit credential file path
    pub fn with_path(path: PathBuf, settings: &Settings) -> Self {
        Self {
            path,
            min_length: settings.password_min_length,
            cost: settings.verifier_cost.clone(),
        }
    }

    /// Path of the credential file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True iff no credential file exists
    pub fn is_first_run(&self) -> bool {
        !self.path.exists()
    }

    /// Human-readable password policy
    pub fn password_requirements(&self) -> String {
        format!(
            "Password must be at least {} characters long and contain at least \
             one letter, one number, and one special character.",
            self.min_length
        )
    }

    /// Check a candidate password against the policy
    pub fn validate_password_strength(&self, password: &str) -> VaultResult<()> {
        let mut problems = Vec::new();

        if password.chars().count() < self.min_length {
            problems.push(format!("must be at least {} characters", self.min_length));
        }
        if !password.chars().any(char::is_alphabetic) {
            problems.push("must contain a letter".to_string());
        }
        if !password.chars().any(char::is_numeric) {
            problems.push("must contain a number".to_string());
        }
        if !password.chars().any(|c| !c.is_alphanumeric()) {
            problems.push("must contain a special character".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(VaultError::WeakPassword(problems.join(", ")))
        }
    }

    /// Set the master password on first run
    ///
    /// Returns the freshly generated key-derivation salt. The credential
    /// file is published without ever replacing an existing one, so when
    /// two processes race on first run exactly one salt survives and the
    /// loser gets `Config`.
    pub fn initialize(&self, password: &str) -> VaultResult<Vec<u8>> {
        self.validate_password_strength(password)?;

        if !self.is_first_run() {
            return Err(self.already_exists());
        }

        let salt = generate_salt();
        let record = CredentialRecord {
            password_hash: hash_password(password, &self.cost)?,
            salt: STANDARD.encode(salt),
            created_at: Utc::now(),
            version: CREDENTIAL_SCHEMA_VERSION,
        };
        let bytes = serde_json::to_vec_pretty(&record)?;

        if !write_new_atomic(&self.path, &bytes, FileMode::OwnerOnly)? {
            debug!("Credential file appeared while initializing");
            return Err(self.already_exists());
        }
        info!(path = %self.path.display(), "Master password initialized");

        Ok(salt.to_vec())
    }

    fn already_exists(&self) -> VaultError {
        VaultError::Config(format!(
            "Credentials already exist at {}",
            self.path.display()
        ))
    }

    /// Check a password against the stored verifier
    ///
    /// Returns the stored key-derivation salt on success.
    pub fn verify(&self, password: &str) -> VaultResult<Vec<u8>> {
        let record = self.load()?;

        if !verify_password(password, &record.password_hash)? {
            debug!("Password verification failed");
            return Err(VaultError::InvalidPassword);
        }

        record.decode_salt()
    }

    /// Load the credential record
    pub fn load(&self) -> VaultResult<CredentialRecord> {
        if self.is_first_run() {
            return Err(VaultError::NoCredentials);
        }
        read_json_required(&self.path)
    }
}
