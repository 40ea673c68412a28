//! Path management for portfolio-vault
//!
//! Resolves the base data directory under which the credential file,
//! the datastore, and backups live.
//!
//! ## Path Resolution Order
//!
//! 1. `PORTFOLIO_VAULT_DATA_DIR` environment variable (if set)
//! 2. The platform data directory (`~/.local/share/portfolio-tracker` on
//!    Linux, `~/Library/Application Support/...` on macOS, `%APPDATA%` on
//!    Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::VaultError;

/// Environment variable that overrides the base directory
pub const DATA_DIR_ENV: &str = "PORTFOLIO_VAULT_DATA_DIR";

const APP_QUALIFIER: &str = "org";
const APP_ORG: &str = "portfolio-tracker";
const APP_NAME: &str = "portfolio-tracker";

/// Manages all paths used by the vault
#[derive(Debug, Clone)]
pub struct VaultPaths {
    /// Base directory for all data
    base_dir: PathBuf,
}

impl VaultPaths {
    /// Create a new VaultPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no platform data directory can be determined.
    pub fn new() -> Result<Self, VaultError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create VaultPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the credential file
    pub fn credentials_file(&self) -> PathBuf {
        self.base_dir.join(".auth")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the database directory
    pub fn database_dir(&self) -> PathBuf {
        self.base_dir.join("database")
    }

    /// Get the path to the datastore file
    pub fn datastore_file(&self) -> PathBuf {
        self.database_dir().join("portfolio.db")
    }

    /// Get the backup directory
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), VaultError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| VaultError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.database_dir()).map_err(|e| {
            VaultError::Io(format!("Failed to create database directory: {}", e))
        })?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| VaultError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }
}

fn resolve_default_path() -> Result<PathBuf, VaultError> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| VaultError::Config("Could not determine data directory".into()))?;
    Ok(dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.credentials_file(), temp_dir.path().join(".auth"));
        assert_eq!(paths.backup_dir(), temp_dir.path().join("backups"));
        assert_eq!(
            paths.datastore_file(),
            temp_dir.path().join("database").join("portfolio.db")
        );
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();
        let custom_path = temp_dir.path().to_str().unwrap();

        env::set_var(DATA_DIR_ENV, custom_path);
        let paths = VaultPaths::new().unwrap();
        env::remove_var(DATA_DIR_ENV);

        assert_eq!(paths.base_dir(), temp_dir.path());
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().join("nested"));

        paths.ensure_directories().unwrap();

        assert!(paths.database_dir().exists());
        assert!(paths.backup_dir().exists());
    }
}
