//! Backup system for portfolio-vault
//!
//! Provides rolling backups of the datastore with a retention limit, and
//! restore functionality.
//!
//! # Backup Format
//!
//! A backup is a byte copy of the datastore named
//! `portfolio_backup_YYYYMMDD_HHMMSS_mmm.db`. When a session is active the
//! copy is encrypted under the master key and stored with `.enc` appended;
//! the plaintext copy is removed once the encrypted file is on disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use portfolio_vault::auth::SessionManager;
//! use portfolio_vault::backup::{BackupManager, RestoreManager};
//! use portfolio_vault::config::{Settings, VaultPaths};
//!
//! let paths = VaultPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let session = SessionManager::new(&paths, &settings)?;
//! session.login("correct horse battery")?;
//!
//! let backups = BackupManager::new(&paths, &settings);
//! let (backup_path, _pruned) = backups.create_backup_with_retention(&session)?;
//!
//! let result = RestoreManager::new(&paths).restore_from_file(&session, &backup_path)?;
//! println!("{}", result.summary());
//! ```

mod manager;
mod restore;

pub use manager::{BackupInfo, BackupManager};
pub use restore::{RestoreManager, RestoreResult};
