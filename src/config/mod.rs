//! Configuration module for portfolio-vault
//!
//! This module provides configuration management including:
//! - Platform path resolution for the data directory
//! - Security settings persistence

pub mod paths;
pub mod settings;

pub use paths::VaultPaths;
pub use settings::{Settings, VerifierCost};
