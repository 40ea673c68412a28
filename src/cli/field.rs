//! Field encoding CLI commands
//!
//! Shows what a value looks like in a "may be sensitive" column, and reads
//! a stored column value back.

use clap::Subcommand;
use serde_json::Value;

use crate::auth::SessionManager;
use crate::error::VaultResult;
use crate::storage::{FieldCodec, FieldSource};

use super::unlock;

/// Field subcommands
#[derive(Subcommand)]
pub enum FieldCommands {
    /// Encode a value for storage
    Encode {
        /// JSON value; anything that is not valid JSON is taken as a string
        value: String,

        /// Store as plaintext without asking for the password
        #[arg(long)]
        plain: bool,
    },

    /// Decode a stored value
    Decode {
        /// Stored column text
        stored: String,

        /// Do not ask for the password; encrypted values come back raw
        #[arg(long)]
        plain: bool,
    },
}

/// Handle a field command
pub fn handle_field_command(session: &SessionManager, cmd: FieldCommands) -> VaultResult<()> {
    match cmd {
        FieldCommands::Encode { value, plain } => {
            if !plain {
                unlock(session)?;
            }
            let value = parse_value(&value);
            let stored = FieldCodec::new(session).encode_field(&value)?;
            println!("{}", stored);
        }

        FieldCommands::Decode { stored, plain } => {
            if !plain {
                unlock(session)?;
            }
            let decoded = FieldCodec::new(session).decode_field(&stored);
            println!("{}", decoded.value);
            eprintln!("source: {}", source_label(decoded.source));
            if decoded.decrypt_failed {
                eprintln!("warning: value looks encrypted but did not decrypt under this password");
            }
        }
    }

    session.logout();
    Ok(())
}

fn parse_value(input: &str) -> Value {
    serde_json::from_str(input).unwrap_or_else(|_| Value::String(input.to_string()))
}

fn source_label(source: FieldSource) -> &'static str {
    match source {
        FieldSource::Decrypted => "decrypted",
        FieldSource::PlainJson => "plaintext json",
        FieldSource::Raw => "raw",
    }
}
