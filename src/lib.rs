//! portfolio-vault - master-password protection for a portfolio tracker
//!
//! This library provides the security core of a local, single-user
//! portfolio tracker: a master password that gates access to the
//! installation, a session key derived from it, and encryption of
//! sensitive column values and backup files under that key.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `crypto`: Key derivation, AES-256-GCM, and the password verifier
//! - `auth`: Credential store and session manager
//! - `storage`: Atomic file writes and the encrypted-field adapter
//! - `backup`: Rolling datastore backups and restore
//! - `cli`: Command handlers for the `pvault` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use portfolio_vault::auth::SessionManager;
//! use portfolio_vault::config::{Settings, VaultPaths};
//! use portfolio_vault::storage::FieldCodec;
//!
//! let paths = VaultPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let session = SessionManager::new(&paths, &settings)?;
//!
//! // Sets the password on first run, verifies it afterwards
//! session.login("Tr0ub4dor&3")?;
//!
//! let codec = FieldCodec::new(&session);
//! let stored = codec.encode_field(&serde_json::json!({"broker_details": "IBKR"}))?;
//! let decoded = codec.decode_field(&stored);
//! ```

pub mod auth;
pub mod backup;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod storage;

pub use auth::{LoginKind, SessionManager};
pub use error::{VaultError, VaultResult};
pub use storage::{DecodedField, FieldCodec, FieldSource};
