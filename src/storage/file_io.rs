//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't corrupt data on failure. A
//! target file is either completely written or not modified at all.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

use crate::error::VaultError;

/// Permissions applied to a file written by [`write_atomic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// World-readable, owner-writable (0644 on Unix)
    Default,
    /// Read/write for the owner only (0600 on Unix, no-op elsewhere)
    OwnerOnly,
}

/// Read JSON from a file, returning an error if file doesn't exist
pub fn read_json_required<T, P>(path: P) -> Result<T, VaultError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    let file = File::open(path)
        .map_err(|e| VaultError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| VaultError::Json(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a file atomically
pub fn write_json_atomic<T, P>(path: P, data: &T, mode: FileMode) -> Result<(), VaultError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let bytes = serde_json::to_vec_pretty(data)
        .map_err(|e| VaultError::Json(format!("Failed to serialize data: {}", e)))?;
    write_atomic(path, &bytes, mode)
}

/// Write bytes to a file atomically (write to temp, sync, then rename)
///
/// When this returns `Ok`, the data is on disk and the file handle is
/// closed. An existing file at `path` is replaced.
pub fn write_atomic<P: AsRef<Path>>(path: P, data: &[u8], mode: FileMode) -> Result<(), VaultError> {
    let path = path.as_ref();
    let temp = write_temp_sibling(path, data, mode)?;

    temp.persist(path)
        .map_err(|e| VaultError::Io(format!("Failed to rename temp file: {}", e.error)))?;
    Ok(())
}

/// Write bytes to a file that must not exist yet
///
/// The file appears fully written or not at all. Returns `Ok(false)`
/// without touching anything when `path` already exists, including when
/// another writer publishes it first.
pub fn write_new_atomic<P: AsRef<Path>>(
    path: P,
    data: &[u8],
    mode: FileMode,
) -> Result<bool, VaultError> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }

    let temp = write_temp_sibling(path, data, mode)?;
    match temp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(VaultError::Io(format!(
            "Failed to publish {}: {}",
            path.display(),
            e.error
        ))),
    }
}

/// Uniquely named, synced temp file in the target's directory
///
/// Same directory as the target so the rename stays on one filesystem. The
/// temp file is removed on drop if it is never persisted.
fn write_temp_sibling(path: &Path, data: &[u8], mode: FileMode) -> Result<NamedTempFile, VaultError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| {
        VaultError::Io(format!(
            "Failed to create directory {}: {}",
            parent.display(),
            e
        ))
    })?;

    let prefix = match path.file_name() {
        Some(name) => format!("{}.", name.to_string_lossy()),
        None => ".".to_string(),
    };
    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| VaultError::Io(format!("Failed to create temp file: {}", e)))?;

    apply_mode(temp.as_file(), mode)?;

    temp.write_all(data)
        .map_err(|e| VaultError::Io(format!("Failed to write data: {}", e)))?;

    temp.as_file()
        .sync_all()
        .map_err(|e| VaultError::Io(format!("Failed to sync data: {}", e)))?;

    Ok(temp)
}

#[cfg(unix)]
fn apply_mode(file: &File, mode: FileMode) -> Result<(), VaultError> {
    use std::os::unix::fs::PermissionsExt;
    let bits = match mode {
        FileMode::Default => 0o644,
        FileMode::OwnerOnly => 0o600,
    };
    file.set_permissions(fs::Permissions::from_mode(bits))
        .map_err(|e| VaultError::Io(format!("Failed to set permissions: {}", e)))
}

#[cfg(not(unix))]
fn apply_mode(_file: &File, _mode: FileMode) -> Result<(), VaultError> {
    Ok(())
}

/// Restrict a file to owner read/write where the platform supports it
#[cfg(unix)]
pub fn restrict_to_owner(path: &Path) -> Result<(), VaultError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| VaultError::Io(format!("Failed to restrict permissions: {}", e)))
}

/// Restrict a file to owner read/write where the platform supports it
#[cfg(not(unix))]
pub fn restrict_to_owner(_path: &Path) -> Result<(), VaultError> {
    Ok(())
}

/// Append a suffix to a path's file name (`a.db` + `.enc` -> `a.db.enc`)
pub fn with_appended_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
