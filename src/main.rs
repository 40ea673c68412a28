use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use portfolio_vault::auth::SessionManager;
use portfolio_vault::cli::{
    handle_backup_command, handle_field_command, handle_file_command, handle_init, handle_status,
    handle_verify, BackupCommands, FieldCommands, FileCommands,
};
use portfolio_vault::config::{paths::DATA_DIR_ENV, Settings, VaultPaths};

#[derive(Parser)]
#[command(
    name = "pvault",
    version,
    about = "Master-password protection for a local portfolio datastore",
    long_about = "pvault manages the master password of a portfolio tracker \
                  installation, encrypts and decrypts files and field values \
                  under the session key, and keeps rolling, encrypted backups \
                  of the datastore."
)]
struct Cli {
    /// Override the data directory
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set the master password on first run
    Init,

    /// Show paths, credential state and settings
    Status,

    /// Check a password against the stored verifier
    Verify,

    /// Encrypt or decrypt files under the master key
    #[command(subcommand)]
    File(FileCommands),

    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Encode or decode stored field values
    #[command(subcommand)]
    Field(FieldCommands),
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Unable to set global default subscriber");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Initialize paths and settings
    let paths = match cli.data_dir {
        Some(dir) => VaultPaths::with_base_dir(dir),
        None => VaultPaths::new()?,
    };
    let settings = Settings::load_or_create(&paths)?;
    let session = SessionManager::new(&paths, &settings)?;

    match cli.command {
        Commands::Init => handle_init(&paths, &settings, &session)?,
        Commands::Status => handle_status(&paths, &settings, &session)?,
        Commands::Verify => handle_verify(&session)?,
        Commands::File(cmd) => handle_file_command(&session, cmd)?,
        Commands::Backup(cmd) => handle_backup_command(&paths, &settings, &session, cmd)?,
        Commands::Field(cmd) => handle_field_command(&session, cmd)?,
    }

    Ok(())
}
