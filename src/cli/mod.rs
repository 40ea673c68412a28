//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the library.

pub mod backup;
pub mod field;
pub mod file;
pub mod vault;

pub use backup::{handle_backup_command, BackupCommands};
pub use field::{handle_field_command, FieldCommands};
pub use file::{handle_file_command, FileCommands};
pub use vault::{handle_init, handle_status, handle_verify};

use crate::auth::{LoginKind, SessionManager};
use crate::crypto::SecureString;
use crate::error::{VaultError, VaultResult};

/// Environment variable holding the master password for scripted use
pub const PASSWORD_ENV: &str = "PORTFOLIO_VAULT_PASSWORD";

fn password_from_env() -> Option<SecureString> {
    match std::env::var(PASSWORD_ENV) {
        Ok(pw) if !pw.is_empty() => Some(SecureString::new(pw)),
        _ => None,
    }
}

/// Prompt for a passphrase (hidden input)
fn prompt_hidden(prompt: &str) -> VaultResult<SecureString> {
    rpassword::prompt_password(prompt)
        .map(SecureString::new)
        .map_err(|e| VaultError::Io(format!("Failed to read password: {}", e)))
}

/// Get the master password from the environment or the terminal
pub fn prompt_password() -> VaultResult<SecureString> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }
    prompt_hidden("Master password: ")
}

/// Prompt for a new master password with confirmation
///
/// A password taken from the environment is checked against the policy
/// but not confirmed.
pub fn prompt_new_password(session: &SessionManager) -> VaultResult<SecureString> {
    let credentials = session.credentials();

    if let Some(pw) = password_from_env() {
        credentials.validate_password_strength(&pw)?;
        return Ok(pw);
    }

    println!("{}", session.password_requirements());
    loop {
        let first = prompt_hidden("New master password: ")?;

        if let Err(e) = credentials.validate_password_strength(&first) {
            println!("{} Please try again.", e);
            continue;
        }

        let second = prompt_hidden("Confirm master password: ")?;
        if first != second {
            println!("Passwords do not match. Please try again.");
            continue;
        }

        return Ok(first);
    }
}

/// Start a session for a command that needs the master key
///
/// Refuses to set a password implicitly; `pvault init` does that.
pub fn unlock(session: &SessionManager) -> VaultResult<LoginKind> {
    if session.is_first_run() {
        return Err(VaultError::NoCredentials);
    }
    let password = prompt_password()?;
    session.login(&password)
}
