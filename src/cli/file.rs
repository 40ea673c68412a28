//! File encryption CLI commands

use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::auth::{SessionManager, ENCRYPTED_FILE_SUFFIX};
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::{write_atomic, FileMode};

use super::unlock;

/// File encryption subcommands
#[derive(Subcommand)]
pub enum FileCommands {
    /// Encrypt a file into a sibling with `.enc` appended
    Encrypt {
        /// File to encrypt
        path: PathBuf,
    },

    /// Decrypt a `.enc` file
    Decrypt {
        /// Encrypted file
        path: PathBuf,

        /// Where to write the plaintext (defaults to the name without `.enc`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a file command
pub fn handle_file_command(session: &SessionManager, cmd: FileCommands) -> VaultResult<()> {
    match cmd {
        FileCommands::Encrypt { path } => {
            if !path.is_file() {
                return Err(VaultError::Io(format!("No such file: {}", path.display())));
            }
            unlock(session)?;

            let encrypted = session.encrypt_file(&path)?;
            println!("Encrypted: {}", encrypted.display());
            println!("The original file was left in place.");
        }

        FileCommands::Decrypt {
            path,
            output,
            force,
        } => {
            let output = match output {
                Some(output) => output,
                None => default_output_path(&path)?,
            };
            if output.exists() && !force {
                return Err(VaultError::Io(format!(
                    "{} already exists; use --force to overwrite",
                    output.display()
                )));
            }
            unlock(session)?;

            let plaintext = session.decrypt_file(&path)?;
            write_atomic(&output, &plaintext, FileMode::OwnerOnly)?;
            println!("Decrypted: {} ({} bytes)", output.display(), plaintext.len());
        }
    }

    session.logout();
    Ok(())
}

/// `data.db.enc` decrypts to `data.db`
fn default_output_path(path: &Path) -> VaultResult<PathBuf> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    match name.strip_suffix(ENCRYPTED_FILE_SUFFIX) {
        Some(stem) if !stem.is_empty() => Ok(path.with_file_name(stem)),
        _ => Err(VaultError::Config(format!(
            "{} does not end in {}; pass --output",
            path.display(),
            ENCRYPTED_FILE_SUFFIX
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/tmp/portfolio.db.enc")).unwrap(),
            PathBuf::from("/tmp/portfolio.db")
        );
        assert!(default_output_path(Path::new("/tmp/portfolio.db")).is_err());
        assert!(default_output_path(Path::new("/tmp/.enc")).is_err());
    }
}
