//! Security settings for portfolio-vault
//!
//! Manages the tunables of the security core: password policy, verifier
//! cost, key derivation iterations, session timeout, and backup retention.

use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::error::VaultError;
use crate::storage::file_io::{write_json_atomic, FileMode};

/// Cost parameters for the slow password verifier (Argon2id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub time_cost: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for VerifierCost {
    fn default() -> Self {
        // About 275 ms per hash in a release build on desktop hardware,
        // in line with bcrypt cost 12 (about 300 ms on the same machine)
        Self {
            memory_kib: 65_536,
            time_cost: 7,
            parallelism: 1,
        }
    }
}

/// User settings for the security core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Minimum master password length in characters
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,

    /// PBKDF2-HMAC-SHA256 iteration count for the session key
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Minutes of inactivity before a session expires
    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: u32,

    /// Cost of the password verifier
    #[serde(default)]
    pub verifier_cost: VerifierCost,

    /// Number of datastore backups to keep
    #[serde(default = "default_backup_count")]
    pub backup_count: u32,
}

fn default_schema_version() -> u32 {
    1
}

fn default_password_min_length() -> usize {
    8
}

fn default_kdf_iterations() -> u32 {
    100_000
}

fn default_session_timeout_minutes() -> u32 {
    30
}

fn default_backup_count() -> u32 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            password_min_length: default_password_min_length(),
            kdf_iterations: default_kdf_iterations(),
            session_timeout_minutes: default_session_timeout_minutes(),
            verifier_cost: VerifierCost::default(),
            backup_count: default_backup_count(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &VaultPaths) -> Result<Self, VaultError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| VaultError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                VaultError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    ///
    /// Writes every field, so a partial hand-edited file is filled in with
    /// the defaults that are actually in effect.
    pub fn save(&self, paths: &VaultPaths) -> Result<(), VaultError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self, FileMode::Default)
    }

    /// Reject values that would disable a protection outright
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.password_min_length == 0 {
            return Err(VaultError::Config(
                "password_min_length must be at least 1".into(),
            ));
        }
        if self.kdf_iterations == 0 {
            return Err(VaultError::Config("kdf_iterations must be at least 1".into()));
        }
        if self.session_timeout_minutes == 0 {
            return Err(VaultError::Config(
                "session_timeout_minutes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Session timeout as a chrono duration
    pub fn session_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.session_timeout_minutes))
    }

    /// Cheap verifier and KDF costs so unit tests stay fast
    #[cfg(test)]
    pub(crate) fn fast_for_tests() -> Self {
        Self {
            kdf_iterations: 1_000,
            verifier_cost: VerifierCost {
                memory_kib: 64,
                time_cost: 1,
                parallelism: 1,
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.password_min_length, 8);
        assert_eq!(settings.kdf_iterations, 100_000);
        assert_eq!(settings.session_timeout_minutes, 30);
        assert_eq!(settings.backup_count, 5);
        assert_eq!(settings.session_timeout(), chrono::Duration::minutes(30));
        assert_eq!(settings.verifier_cost.memory_kib, 65_536);
        assert_eq!(settings.verifier_cost.time_cost, 7);
        assert_eq!(settings.verifier_cost.parallelism, 1);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.session_timeout_minutes = 5;
        settings.kdf_iterations = 200_000;
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.session_timeout_minutes, 5);
        assert_eq!(loaded.kdf_iterations, 200_000);
    }

    #[test]
    fn test_save_fills_in_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), r#"{"backup_count": 2}"#).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        loaded.save(&paths).unwrap();

        let contents = std::fs::read_to_string(paths.settings_file()).unwrap();
        assert!(contents.contains("\"backup_count\": 2"));
        assert!(contents.contains("\"session_timeout_minutes\": 30"));
        assert!(contents.contains("\"memory_kib\": 65536"));

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), r#"{"password_min_length": 12}"#).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.password_min_length, 12);
        assert_eq!(loaded.kdf_iterations, 100_000);
        assert_eq!(loaded.verifier_cost, VerifierCost::default());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), r#"{"session_timeout_minutes": 0}"#).unwrap();

        let result = Settings::load_or_create(&paths);
        assert!(matches!(result, Err(VaultError::Config(_))));
    }
}
