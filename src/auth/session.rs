//! Session and cipher manager
//!
//! Owns the AES-256-GCM cipher derived from the master password for the
//! lifetime of an authenticated session, and gates every encryption and
//! decryption behind that session.
//!
//! Sessions use a sliding window: `extend_session` pushes the expiry
//! forward by the full timeout again. Expiry is observed lazily, so an
//! expired session is cleared by the first call that notices it rather
//! than by a background timer.
//!
//! # Locking
//!
//! Session state sits behind one `RwLock`. Encrypt and decrypt hold the
//! read lock, so many fields can be processed in parallel. Login, logout
//! and extension take the write lock. `is_authenticated` holds an
//! upgradable read and only upgrades to clear an expired session, which
//! keeps the check-then-clear atomic.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::credentials::CredentialStore;
use crate::config::{Settings, VaultPaths};
use crate::crypto::{derive_key, Cipher};
use crate::error::{VaultError, VaultResult};
use crate::storage::file_io::{with_appended_suffix, write_atomic, FileMode};

/// Suffix appended to the name of an encrypted file
pub const ENCRYPTED_FILE_SUFFIX: &str = ".enc";

/// Which path a successful login took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginKind {
    /// First run: the master password was just set
    Initialized,
    /// Existing credentials were verified
    Verified,
}

/// Key material and expiry, always present or absent together
struct ActiveSession {
    cipher: Cipher,
    expires_at: DateTime<Utc>,
}

/// Owns the session key and performs all encryption for the datastore
pub struct SessionManager {
    credentials: CredentialStore,
    kdf_iterations: u32,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    state: RwLock<Option<ActiveSession>>,
}

impl SessionManager {
    /// Create a session manager using wall-clock time
    pub fn new(paths: &VaultPaths, settings: &Settings) -> VaultResult<Self> {
        Self::with_clock(paths, settings, Arc::new(SystemClock))
    }

    /// Create a session manager with an explicit time source
    pub fn with_clock(
        paths: &VaultPaths,
        settings: &Settings,
        clock: Arc<dyn Clock>,
    ) -> VaultResult<Self> {
        settings.validate()?;
        Ok(Self {
            credentials: CredentialStore::new(paths, settings),
            kdf_iterations: settings.kdf_iterations,
            timeout: settings.session_timeout(),
            clock,
            state: RwLock::new(None),
        })
    }

    /// The underlying credential store
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// True iff no master password has been set yet
    pub fn is_first_run(&self) -> bool {
        self.credentials.is_first_run()
    }

    /// Human-readable password policy
    pub fn password_requirements(&self) -> String {
        self.credentials.password_requirements()
    }

    /// Authenticate with the master password and start a session
    ///
    /// On first run the password becomes the master password. Otherwise it
    /// must match the stored verifier. A failed attempt leaves any existing
    /// session untouched.
    pub fn login(&self, password: &str) -> VaultResult<LoginKind> {
        let (salt, kind) = if self.credentials.is_first_run() {
            match self.credentials.initialize(password) {
                Ok(salt) => (salt, LoginKind::Initialized),
                // Another process set the password first
                Err(VaultError::Config(_)) if !self.credentials.is_first_run() => {
                    (self.credentials.verify(password)?, LoginKind::Verified)
                }
                Err(e) => return Err(e),
            }
        } else {
            (self.credentials.verify(password)?, LoginKind::Verified)
        };

        // Derivation is slow, keep it outside the lock
        let key = derive_key(password, &salt, self.kdf_iterations)?;
        let cipher = Cipher::new(&key)?;
        drop(key);

        let expires_at = self.clock.now() + self.timeout;
        *self.state.write() = Some(ActiveSession { cipher, expires_at });

        info!(?kind, %expires_at, "Session started");
        Ok(kind)
    }

    /// True iff a session exists and has not expired
    ///
    /// Clears an expired session as a side effect.
    pub fn is_authenticated(&self) -> bool {
        let now = self.clock.now();
        let guard = self.state.upgradable_read();

        let expired = match guard.as_ref() {
            None => return false,
            Some(session) => now >= session.expires_at,
        };
        if !expired {
            return true;
        }

        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        *guard = None;
        debug!("Session expired");
        false
    }

    /// Expiry of the current session, if one is active
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if !self.is_authenticated() {
            return None;
        }
        self.state.read().as_ref().map(|s| s.expires_at)
    }

    /// Slide the expiry forward by the full timeout
    ///
    /// Returns false (and does nothing) when not authenticated.
    pub fn extend_session(&self) -> bool {
        let now = self.clock.now();
        let mut guard = self.state.write();

        let expired = match guard.as_ref() {
            None => return false,
            Some(session) => now >= session.expires_at,
        };
        if expired {
            *guard = None;
            debug!("Session expired");
            return false;
        }

        if let Some(session) = guard.as_mut() {
            session.expires_at = now + self.timeout;
        }
        true
    }

    /// End the session and drop the key
    pub fn logout(&self) {
        if self.state.write().take().is_some() {
            info!("Session ended");
        }
    }

    /// Encrypt bytes under the session key
    pub fn encrypt(&self, plaintext: &[u8]) -> VaultResult<Vec<u8>> {
        self.with_cipher(|cipher| cipher.seal(plaintext))
    }

    /// Decrypt bytes produced by [`SessionManager::encrypt`]
    pub fn decrypt(&self, ciphertext: &[u8]) -> VaultResult<Vec<u8>> {
        self.with_cipher(|cipher| cipher.open(ciphertext))
    }

    /// Encrypt a file into a sibling with [`ENCRYPTED_FILE_SUFFIX`] appended
    ///
    /// The original is left in place. When this returns, the encrypted copy
    /// is fully written, synced and closed.
    pub fn encrypt_file(&self, path: &Path) -> VaultResult<PathBuf> {
        if !self.is_authenticated() {
            return Err(VaultError::NotAuthenticated);
        }

        let plaintext = fs::read(path)
            .map_err(|e| VaultError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let sealed = self.encrypt(&plaintext)?;

        let encrypted_path = with_appended_suffix(path, ENCRYPTED_FILE_SUFFIX);
        write_atomic(&encrypted_path, &sealed, FileMode::OwnerOnly)?;

        debug!(path = %encrypted_path.display(), "Encrypted file written");
        Ok(encrypted_path)
    }

    /// Decrypt a file produced by [`SessionManager::encrypt_file`]
    ///
    /// Returns the plaintext; nothing is written.
    pub fn decrypt_file(&self, path: &Path) -> VaultResult<Vec<u8>> {
        if !self.is_authenticated() {
            return Err(VaultError::NotAuthenticated);
        }

        let sealed = fs::read(path)
            .map_err(|e| VaultError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        self.decrypt(&sealed)
    }

    fn with_cipher<T>(&self, op: impl FnOnce(&Cipher) -> VaultResult<T>) -> VaultResult<T> {
        let now = self.clock.now();
        {
            let guard = self.state.read();
            match guard.as_ref() {
                None => return Err(VaultError::NotAuthenticated),
                Some(session) if now < session.expires_at => return op(&session.cipher),
                Some(_) => {}
            }
        }

        // Expired: let the upgradable path clear it
        self.is_authenticated();
        Err(VaultError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use tempfile::TempDir;

    const PASSWORD: &str = "Tr0ub4dor&3";

    fn create_test_manager() -> (SessionManager, ManualClock, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let clock = ManualClock::new(Utc::now());
        let manager = SessionManager::with_clock(
            &paths,
            &Settings::fast_for_tests(),
            Arc::new(clock.clone()),
        )
        .unwrap();
        (manager, clock, temp_dir)
    }

    fn reopen(temp_dir: &TempDir, clock: &ManualClock) -> SessionManager {
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        SessionManager::with_clock(
            &paths,
            &Settings::fast_for_tests(),
            Arc::new(clock.clone()),
        )
        .unwrap()
    }

    #[test]
    fn test_first_run_scenario() {
        let (manager, _clock, _temp) = create_test_manager();
        assert!(manager.is_first_run());
        assert!(!manager.is_authenticated());

        assert_eq!(manager.login(PASSWORD).unwrap(), LoginKind::Initialized);
        assert!(!manager.is_first_run());
        assert!(manager.is_authenticated());

        manager.logout();
        assert_eq!(manager.login(PASSWORD).unwrap(), LoginKind::Verified);
        assert!(manager.is_authenticated());
    }

    #[test]
    fn test_weak_first_password() {
        let (manager, _clock, _temp) = create_test_manager();
        assert!(matches!(
            manager.login("short"),
            Err(VaultError::WeakPassword(_))
        ));
        assert!(manager.is_first_run());
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_wrong_password_keeps_state() {
        let (manager, _clock, _temp) = create_test_manager();
        manager.login(PASSWORD).unwrap();
        manager.logout();

        assert!(matches!(
            manager.login("Wr0ng&Pass"),
            Err(VaultError::InvalidPassword)
        ));
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_not_authenticated_errors() {
        let (manager, _clock, temp) = create_test_manager();
        let file = temp.path().join("plain.db");
        fs::write(&file, b"data").unwrap();

        assert!(matches!(manager.encrypt(b"x"), Err(VaultError::NotAuthenticated)));
        assert!(matches!(manager.decrypt(b"x"), Err(VaultError::NotAuthenticated)));
        assert!(matches!(
            manager.encrypt_file(&file),
            Err(VaultError::NotAuthenticated)
        ));
        assert!(matches!(
            manager.decrypt_file(&file),
            Err(VaultError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_round_trip() {
        let (manager, _clock, _temp) = create_test_manager();
        manager.login(PASSWORD).unwrap();

        for plaintext in [&b""[..], &b"a"[..], &b"portfolio data"[..], &[0u8; 4096][..]] {
            let sealed = manager.encrypt(plaintext).unwrap();
            assert_eq!(manager.decrypt(&sealed).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_tamper_detected() {
        let (manager, _clock, _temp) = create_test_manager();
        manager.login(PASSWORD).unwrap();

        let sealed = manager.encrypt(b"holdings").unwrap();
        for i in 0..sealed.len() {
            let mut tampered = sealed.clone();
            tampered[i] ^= 0x01;
            assert!(matches!(
                manager.decrypt(&tampered),
                Err(VaultError::DecryptionFailed)
            ));
        }
    }

    #[test]
    fn test_key_survives_restart() {
        let (manager, clock, temp) = create_test_manager();
        manager.login(PASSWORD).unwrap();
        let sealed = manager.encrypt(b"persisted").unwrap();
        drop(manager);

        let restarted = reopen(&temp, &clock);
        restarted.login(PASSWORD).unwrap();
        assert_eq!(restarted.decrypt(&sealed).unwrap(), b"persisted");
    }

    #[test]
    fn test_cross_session_isolation() {
        let (first, clock, temp_a) = create_test_manager();
        first.login(PASSWORD).unwrap();
        let sealed = first.encrypt(b"secret").unwrap();

        let temp_b = TempDir::new().unwrap();
        let second = reopen(&temp_b, &clock);
        second.login("D1fferent&Pass").unwrap();

        assert!(matches!(
            second.decrypt(&sealed),
            Err(VaultError::DecryptionFailed)
        ));
        drop(temp_a);
    }

    #[test]
    fn test_expiry_clears_session() {
        let (manager, clock, _temp) = create_test_manager();
        manager.login(PASSWORD).unwrap();
        assert!(manager.is_authenticated());

        clock.advance(Duration::minutes(29));
        assert!(manager.is_authenticated());

        clock.advance(Duration::minutes(1));
        assert!(!manager.is_authenticated());
        assert!(manager.expires_at().is_none());
        assert!(matches!(manager.encrypt(b"x"), Err(VaultError::NotAuthenticated)));

        // Cleared, not just hidden: moving time back does not revive it
        clock.advance(Duration::minutes(-30));
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_encrypt_notices_expiry() {
        let (manager, clock, _temp) = create_test_manager();
        manager.login(PASSWORD).unwrap();

        clock.advance(Duration::minutes(31));
        assert!(matches!(manager.encrypt(b"x"), Err(VaultError::NotAuthenticated)));

        clock.advance(Duration::minutes(-31));
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_extend_session_slides_window() {
        let (manager, clock, _temp) = create_test_manager();
        manager.login(PASSWORD).unwrap();

        clock.advance(Duration::minutes(20));
        assert!(manager.extend_session());
        let expected = clock.now() + Duration::minutes(30);
        assert_eq!(manager.expires_at(), Some(expected));

        clock.advance(Duration::minutes(20));
        assert!(manager.is_authenticated());

        clock.advance(Duration::minutes(10));
        assert!(!manager.is_authenticated());
        assert!(!manager.extend_session());
    }

    #[test]
    fn test_extend_without_session() {
        let (manager, _clock, _temp) = create_test_manager();
        assert!(!manager.extend_session());
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_logout_clears_key() {
        let (manager, _clock, _temp) = create_test_manager();
        manager.login(PASSWORD).unwrap();
        let sealed = manager.encrypt(b"x").unwrap();

        manager.logout();
        assert!(!manager.is_authenticated());
        assert!(manager.expires_at().is_none());
        assert!(matches!(
            manager.decrypt(&sealed),
            Err(VaultError::NotAuthenticated)
        ));

        // Idempotent
        manager.logout();
    }

    #[test]
    fn test_encrypt_file_leaves_original() {
        let (manager, _clock, temp) = create_test_manager();
        manager.login(PASSWORD).unwrap();

        let original = temp.path().join("portfolio_backup.db");
        fs::write(&original, b"SQLite format 3\0rows").unwrap();

        let encrypted = manager.encrypt_file(&original).unwrap();
        assert_eq!(encrypted, temp.path().join("portfolio_backup.db.enc"));
        assert!(original.exists());
        assert_ne!(fs::read(&encrypted).unwrap(), fs::read(&original).unwrap());

        let decrypted = manager.decrypt_file(&encrypted).unwrap();
        assert_eq!(decrypted, b"SQLite format 3\0rows");
    }

    #[test]
    fn test_decrypt_file_missing() {
        let (manager, _clock, temp) = create_test_manager();
        manager.login(PASSWORD).unwrap();

        let result = manager.decrypt_file(&temp.path().join("missing.enc"));
        assert!(matches!(result, Err(VaultError::Io(_))));
    }

    #[test]
    fn test_parallel_readers() {
        let (manager, _clock, _temp) = create_test_manager();
        manager.login(PASSWORD).unwrap();
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    let plaintext = format!("field-{}", i);
                    let sealed = manager.encrypt(plaintext.as_bytes()).unwrap();
                    assert_eq!(manager.decrypt(&sealed).unwrap(), plaintext.as_bytes());
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    fn race_first_login(
        temp_dir: &TempDir,
        passwords: [&'static str; 2],
    ) -> Vec<(VaultResult<LoginKind>, SessionManager)> {
        use std::sync::Barrier;

        let clock = ManualClock::new(Utc::now());
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = passwords
            .into_iter()
            .map(|password| {
                let manager = reopen(temp_dir, &clock);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    (manager.login(password), manager)
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn test_racing_first_login_same_password() {
        let temp_dir = TempDir::new().unwrap();
        let results = race_first_login(&temp_dir, [PASSWORD, PASSWORD]);

        let kinds: Vec<LoginKind> = results
            .iter()
            .map(|(result, _)| *result.as_ref().unwrap())
            .collect();
        assert!(kinds.contains(&LoginKind::Initialized));
        assert!(kinds.contains(&LoginKind::Verified));

        // Both sessions hold the same key
        let sealed = results[0].1.encrypt(b"holding").unwrap();
        assert_eq!(results[1].1.decrypt(&sealed).unwrap(), b"holding");
    }

    #[test]
    fn test_racing_first_login_different_passwords() {
        let temp_dir = TempDir::new().unwrap();
        let results = race_first_login(&temp_dir, ["Alpha&111", "Bravo&222"]);

        let (winner, loser): (Vec<_>, Vec<_>) = results
            .into_iter()
            .zip(["Alpha&111", "Bravo&222"])
            .partition(|((result, _), _)| result.is_ok());
        assert_eq!(winner.len(), 1);
        assert!(matches!(loser[0].0 .0, Err(VaultError::InvalidPassword)));

        let ((_, manager), password) = &winner[0];
        let sealed = manager.encrypt(b"holding").unwrap();

        // The stored salt is the winner's, so a fresh login reads old data
        let reopened = reopen(&temp_dir, &ManualClock::new(Utc::now()));
        assert_eq!(reopened.login(password).unwrap(), LoginKind::Verified);
        assert_eq!(reopened.decrypt(&sealed).unwrap(), b"holding");
    }
}
