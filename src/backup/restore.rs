//! Backup restoration for portfolio-vault
//!
//! Handles restoring the datastore from a backup file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::auth::{SessionManager, ENCRYPTED_FILE_SUFFIX};
use crate::config::VaultPaths;
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::{write_atomic, FileMode};

/// Handles restoring from backups
pub struct RestoreManager {
    datastore: PathBuf,
}

impl RestoreManager {
    /// Create a new RestoreManager
    pub fn new(paths: &VaultPaths) -> Self {
        Self::with_datastore(paths.datastore_file())
    }

    /// Create a RestoreManager targeting an explicit datastore path
    pub fn with_datastore(datastore: PathBuf) -> Self {
        Self { datastore }
    }

    /// Restore the datastore from a backup file
    ///
    /// This overwrites the current datastore. Encrypted backups need an
    /// active session; a backup that does not decrypt under the current
    /// key leaves the datastore untouched.
    pub fn restore_from_file(
        &self,
        session: &SessionManager,
        backup_path: &Path,
    ) -> VaultResult<RestoreResult> {
        if !backup_path.exists() {
            return Err(VaultError::Backup(format!(
                "Backup not found: {}",
                backup_path.display()
            )));
        }

        let was_encrypted = is_encrypted_backup(backup_path);
        let contents = if was_encrypted {
            session.decrypt_file(backup_path)?
        } else {
            fs::read(backup_path)
                .map_err(|e| VaultError::Io(format!("Failed to read backup file: {}", e)))?
        };

        write_atomic(&self.datastore, &contents, FileMode::OwnerOnly)?;

        info!(
            backup = %backup_path.display(),
            bytes = contents.len(),
            encrypted = was_encrypted,
            "Datastore restored from backup"
        );

        Ok(RestoreResult {
            bytes_restored: contents.len() as u64,
            was_encrypted,
        })
    }
}

fn is_encrypted_backup(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(ENCRYPTED_FILE_SUFFIX))
        .unwrap_or(false)
}

/// Result of a restore operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreResult {
    /// Size of the restored datastore
    pub bytes_restored: u64,
    /// Whether the backup had to be decrypted
    pub was_encrypted: bool,
}

impl RestoreResult {
    /// Get a summary of what was restored
    pub fn summary(&self) -> String {
        format!(
            "Restored {} bytes from {} backup",
            self.bytes_restored,
            if self.was_encrypted {
                "an encrypted"
            } else {
                "a plaintext"
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::manager::BackupManager;
    use crate::config::Settings;
    use tempfile::TempDir;

    const PASSWORD: &str = "Tr0ub4dor&3";
    const ORIGINAL: &[u8] = b"SQLite format 3\0original rows";

    fn create_test_env() -> (RestoreManager, BackupManager, SessionManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();
        fs::write(paths.datastore_file(), ORIGINAL).unwrap();

        let settings = Settings::fast_for_tests();
        let backup_manager = BackupManager::new(&paths, &settings);
        let restore_manager = RestoreManager::new(&paths);
        let session = SessionManager::new(&paths, &settings).unwrap();

        (restore_manager, backup_manager, session, temp_dir)
    }

    #[test]
    fn test_restore_plaintext_backup() {
        let (restore_manager, backup_manager, session, _temp) = create_test_env();

        let backup_path = backup_manager.create_backup(&session).unwrap();
        fs::write(backup_manager.datastore(), b"damaged").unwrap();

        let result = restore_manager
            .restore_from_file(&session, &backup_path)
            .unwrap();
        assert!(!result.was_encrypted);
        assert_eq!(result.bytes_restored, ORIGINAL.len() as u64);
        assert_eq!(fs::read(backup_manager.datastore()).unwrap(), ORIGINAL);
    }

    #[test]
    fn test_restore_encrypted_backup() {
        let (restore_manager, backup_manager, session, _temp) = create_test_env();
        session.login(PASSWORD).unwrap();

        let backup_path = backup_manager.create_backup(&session).unwrap();
        fs::remove_file(backup_manager.datastore()).unwrap();

        let result = restore_manager
            .restore_from_file(&session, &backup_path)
            .unwrap();
        assert!(result.was_encrypted);
        assert_eq!(fs::read(backup_manager.datastore()).unwrap(), ORIGINAL);
    }

    #[test]
    fn test_encrypted_restore_requires_session() {
        let (restore_manager, backup_manager, session, _temp) = create_test_env();
        session.login(PASSWORD).unwrap();
        let backup_path = backup_manager.create_backup(&session).unwrap();
        session.logout();

        fs::write(backup_manager.datastore(), b"current").unwrap();
        let result = restore_manager.restore_from_file(&session, &backup_path);
        assert!(matches!(result, Err(VaultError::NotAuthenticated)));
        assert_eq!(fs::read(backup_manager.datastore()).unwrap(), b"current");
    }

    #[test]
    fn test_tampered_backup_leaves_datastore() {
        let (restore_manager, backup_manager, session, _temp) = create_test_env();
        session.login(PASSWORD).unwrap();
        let backup_path = backup_manager.create_backup(&session).unwrap();

        let mut bytes = fs::read(&backup_path).unwrap();
        bytes[20] ^= 0xff;
        fs::write(&backup_path, bytes).unwrap();

        let result = restore_manager.restore_from_file(&session, &backup_path);
        assert!(matches!(result, Err(VaultError::DecryptionFailed)));
        assert_eq!(fs::read(backup_manager.datastore()).unwrap(), ORIGINAL);
    }

    #[test]
    fn test_missing_backup() {
        let (restore_manager, _backup_manager, session, temp) = create_test_env();
        let result =
            restore_manager.restore_from_file(&session, &temp.path().join("nope.db"));
        assert!(matches!(result, Err(VaultError::Backup(_))));
    }

    #[test]
    fn test_restore_result_summary() {
        let result = RestoreResult {
            bytes_restored: 42,
            was_encrypted: true,
        };
        assert_eq!(result.summary(), "Restored 42 bytes from an encrypted backup");
    }
}
