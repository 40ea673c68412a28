//! Backup manager for portfolio-vault
//!
//! Copies the datastore into the backup directory and, when a session is
//! active, replaces the copy with an encrypted sibling. Keeps a fixed
//! number of the most recent backups.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{SessionManager, ENCRYPTED_FILE_SUFFIX};
use crate::config::{Settings, VaultPaths};
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::{restrict_to_owner, with_appended_suffix};

const BACKUP_PREFIX: &str = "portfolio_backup_";
const BACKUP_EXTENSION: &str = ".db";
/// Milliseconds to step forward looking for an unused backup name
const MAX_NAME_ATTEMPTS: i64 = 1000;

/// Metadata about a backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Backup filename
    pub filename: String,
    /// Full path to backup
    pub path: PathBuf,
    /// When the backup was created
    pub created_at: DateTime<Utc>,
    /// Size in bytes
    pub size_bytes: u64,
    /// Whether the backup is encrypted under the master key
    pub encrypted: bool,
}

/// Manages backup creation and retention
pub struct BackupManager {
    /// Path to the live datastore
    datastore: PathBuf,
    /// Path to backup directory
    backup_dir: PathBuf,
    /// Number of backups to keep
    keep: usize,
}

impl BackupManager {
    /// Create a new BackupManager
    pub fn new(paths: &VaultPaths, settings: &Settings) -> Self {
        Self::with_locations(
            paths.datastore_file(),
            paths.backup_dir(),
            settings.backup_count as usize,
        )
    }

    /// Create a BackupManager for explicit locations
    pub fn with_locations(datastore: PathBuf, backup_dir: PathBuf, keep: usize) -> Self {
        Self {
            datastore,
            backup_dir,
            keep,
        }
    }

    /// Create a backup of the datastore
    ///
    /// Returns the path to the created backup file. With an active session
    /// that is the encrypted `.enc` file and the plaintext copy is removed,
    /// but only after the encrypted file is completely on disk. If
    /// encryption fails the plaintext copy is kept and returned.
    pub fn create_backup(&self, session: &SessionManager) -> VaultResult<PathBuf> {
        if !self.datastore.exists() {
            return Err(VaultError::Backup(format!(
                "Datastore not found: {}",
                self.datastore.display()
            )));
        }

        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| VaultError::Io(format!("Failed to create backup directory: {}", e)))?;

        let (backup_path, mut file) = self.reserve_backup_file(Utc::now())?;

        let copied = File::open(&self.datastore)
            .and_then(|mut source| io::copy(&mut source, &mut file))
            .and_then(|_| file.sync_all());
        drop(file);
        if let Err(e) = copied {
            let _ = fs::remove_file(&backup_path);
            return Err(VaultError::Io(format!("Failed to copy datastore: {}", e)));
        }
        restrict_to_owner(&backup_path)?;

        if !session.is_authenticated() {
            info!(path = %backup_path.display(), "Backup created (unencrypted)");
            return Ok(backup_path);
        }

        match session.encrypt_file(&backup_path) {
            Ok(encrypted_path) => {
                if let Err(e) = fs::remove_file(&backup_path) {
                    warn!(
                        path = %backup_path.display(),
                        error = %e,
                        "Encrypted backup written but plaintext copy could not be removed"
                    );
                }
                info!(path = %encrypted_path.display(), "Backup created (encrypted)");
                Ok(encrypted_path)
            }
            Err(e) => {
                warn!(error = %e, "Could not encrypt backup, keeping plaintext copy");
                Ok(backup_path)
            }
        }
    }

    /// Create an empty backup file whose name no other backup uses
    ///
    /// Names carry millisecond timestamps. When `now` is taken, by this
    /// or another process, the timestamp is stepped forward one
    /// millisecond at a time. A name is also skipped while its encrypted
    /// sibling exists.
    fn reserve_backup_file(&self, now: DateTime<Utc>) -> VaultResult<(PathBuf, File)> {
        for offset in 0..MAX_NAME_ATTEMPTS {
            let path = self
                .backup_dir
                .join(backup_filename(now + chrono::Duration::milliseconds(offset)));
            if with_appended_suffix(&path, ENCRYPTED_FILE_SUFFIX).exists() {
                continue;
            }

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(VaultError::Io(format!(
                        "Failed to create backup file {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }

        Err(VaultError::Backup(format!(
            "No free backup name near {}",
            now.format("%Y-%m-%d %H:%M:%S")
        )))
    }

    /// List all available backups, newest first
    pub fn list_backups(&self) -> VaultResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir)
            .map_err(|e| VaultError::Io(format!("Failed to read backup directory: {}", e)))?
        {
            let entry = entry
                .map_err(|e| VaultError::Io(format!("Failed to read directory entry: {}", e)))?;

            if let Some(info) = parse_backup_info(&entry.path()) {
                backups.push(info);
            }
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(backups)
    }

    /// Enforce retention policy by deleting old backups
    pub fn enforce_retention(&self) -> VaultResult<Vec<PathBuf>> {
        let backups = self.list_backups()?;
        let mut deleted = Vec::new();

        for backup in backups.into_iter().skip(self.keep) {
            fs::remove_file(&backup.path)
                .map_err(|e| VaultError::Io(format!("Failed to delete old backup: {}", e)))?;
            deleted.push(backup.path);
        }

        if !deleted.is_empty() {
            info!(count = deleted.len(), "Pruned old backups");
        }
        Ok(deleted)
    }

    /// Create a backup and then enforce retention policy
    pub fn create_backup_with_retention(
        &self,
        session: &SessionManager,
    ) -> VaultResult<(PathBuf, Vec<PathBuf>)> {
        let backup_path = self.create_backup(session)?;
        let deleted = self.enforce_retention()?;
        Ok((backup_path, deleted))
    }

    /// Get backup directory path
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Get the datastore path
    pub fn datastore(&self) -> &Path {
        &self.datastore
    }

    /// Number of backups kept by retention
    pub fn keep(&self) -> usize {
        self.keep
    }

    /// Get a specific backup by filename
    pub fn get_backup(&self, filename: &str) -> Option<BackupInfo> {
        parse_backup_info(&self.backup_dir.join(filename))
    }

    /// Get the most recent backup
    pub fn get_latest_backup(&self) -> VaultResult<Option<BackupInfo>> {
        Ok(self.list_backups()?.into_iter().next())
    }
}

fn backup_filename(at: DateTime<Utc>) -> String {
    format!(
        "{}{}_{:03}{}",
        BACKUP_PREFIX,
        at.format("%Y%m%d_%H%M%S"),
        at.timestamp_subsec_millis(),
        BACKUP_EXTENSION
    )
}

/// Parse backup info from a backup file path
fn parse_backup_info(path: &Path) -> Option<BackupInfo> {
    let filename = path.file_name()?.to_string_lossy().to_string();

    let (stem, encrypted) = match filename.strip_suffix(ENCRYPTED_FILE_SUFFIX) {
        Some(stem) => (stem, true),
        None => (filename.as_str(), false),
    };
    let date_part = stem
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_EXTENSION)?;
    let created_at = parse_backup_timestamp(date_part)?;

    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }

    Some(BackupInfo {
        path: path.to_path_buf(),
        created_at,
        size_bytes: metadata.len(),
        encrypted,
        filename,
    })
}

/// Parse a backup timestamp from the filename date part
fn parse_backup_timestamp(date_str: &str) -> Option<DateTime<Utc>> {
    // YYYYMMDD_HHMMSS or YYYYMMDD_HHMMSS_mmm
    let parts: Vec<&str> = date_str.split('_').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let date_part = parts[0];
    let time_part = parts[1];
    let millis: u32 = if parts.len() == 3 {
        parts[2].parse().ok()?
    } else {
        0
    };

    if date_part.len() != 8 || time_part.len() != 6 {
        return None;
    }

    let year: i32 = date_part[0..4].parse().ok()?;
    let month: u32 = date_part[4..6].parse().ok()?;
    let day: u32 = date_part[6..8].parse().ok()?;
    let hour: u32 = time_part[0..2].parse().ok()?;
    let minute: u32 = time_part[2..4].parse().ok()?;
    let second: u32 = time_part[4..6].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = chrono::NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;
    let datetime = chrono::NaiveDateTime::new(date, time);

    Some(DateTime::from_naive_utc_and_offset(datetime, Utc))
}
