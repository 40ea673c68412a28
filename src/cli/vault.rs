//! Master password CLI commands
//!
//! First-run setup, password verification, and a status overview.

use crate::auth::{LoginKind, SessionManager};
use crate::backup::BackupManager;
use crate::config::{Settings, VaultPaths};
use crate::error::{VaultError, VaultResult};

use super::{prompt_new_password, prompt_password};

/// Set the master password for a fresh installation
pub fn handle_init(
    paths: &VaultPaths,
    settings: &Settings,
    session: &SessionManager,
) -> VaultResult<()> {
    if !session.is_first_run() {
        println!("A master password is already set.");
        println!("Credentials: {}", session.credentials().path().display());
        return Ok(());
    }

    println!("Initializing portfolio vault at: {}", paths.base_dir().display());
    println!();
    println!("IMPORTANT: If you forget the master password, encrypted data cannot be recovered!");
    println!();

    paths.ensure_directories()?;
    let password = prompt_new_password(session)?;

    match session.login(&password)? {
        LoginKind::Initialized => {
            settings.save(paths)?;
            println!("Master password set.");
            println!("Credentials: {}", session.credentials().path().display());
            println!("Settings: {}", paths.settings_file().display());
            Ok(())
        }
        // Another process won the race to create the credential file
        LoginKind::Verified => {
            println!("A master password was already set; password verified.");
            Ok(())
        }
    }
}

/// Check a password against the stored verifier
pub fn handle_verify(session: &SessionManager) -> VaultResult<()> {
    if session.is_first_run() {
        return Err(VaultError::NoCredentials);
    }

    let password = prompt_password()?;
    session.login(&password)?;

    println!("Password is correct.");
    if let Some(expires_at) = session.expires_at() {
        println!(
            "Session would expire at {}",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    session.logout();
    Ok(())
}

/// Show paths, credential state, settings and backups
pub fn handle_status(
    paths: &VaultPaths,
    settings: &Settings,
    session: &SessionManager,
) -> VaultResult<()> {
    println!("Portfolio Vault Status");
    println!("======================");
    println!("Data directory:   {}", paths.base_dir().display());
    println!("Credentials file: {}", paths.credentials_file().display());
    println!("Datastore:        {}", paths.datastore_file().display());
    println!("Backup directory: {}", paths.backup_dir().display());
    println!();

    if session.is_first_run() {
        println!("Master password: NOT SET");
        println!("Run 'pvault init' to set one.");
    } else {
        let record = session.credentials().load()?;
        println!("Master password: SET");
        println!(
            "  Created: {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("  Schema version: {}", record.version);
    }
    println!();

    println!("Settings:");
    println!("  Minimum password length: {}", settings.password_min_length);
    println!("  Key derivation: PBKDF2-HMAC-SHA256, {} iterations", settings.kdf_iterations);
    println!(
        "  Verifier: Argon2id, {} KiB, {} passes, {} lanes",
        settings.verifier_cost.memory_kib,
        settings.verifier_cost.time_cost,
        settings.verifier_cost.parallelism
    );
    println!("  Session timeout: {} minutes", settings.session_timeout_minutes);
    println!("  Backups kept: {}", settings.backup_count);
    println!();

    let backups = BackupManager::new(paths, settings).list_backups()?;
    let encrypted = backups.iter().filter(|b| b.encrypted).count();
    println!(
        "Backups: {} ({} encrypted, {} plaintext)",
        backups.len(),
        encrypted,
        backups.len() - encrypted
    );

    Ok(())
}
