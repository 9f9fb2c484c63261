//! Session persistence and credential storage.
//!
//! The console signs in against the hosted auth endpoint and keeps the
//! resulting session on disk between runs. Passwords are kept in the OS
//! keychain, never in the config or session files.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
