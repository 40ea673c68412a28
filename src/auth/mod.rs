//! Master-password authentication
//!
//! - `credentials`: persists the password verifier and key salt
//! - `session`: owns the session key and gates encryption behind it
//! - `clock`: time source used for session expiry

pub mod clock;
pub mod credentials;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{CredentialRecord, CredentialStore};
pub use session::{LoginKind, SessionManager, ENCRYPTED_FILE_SUFFIX};
