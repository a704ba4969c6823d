//! Credential session lifecycle: login, refresh rotation, logout, and
//! per-request access validation.

pub mod identity;
pub mod manager;

pub use identity::AuthenticatedIdentity;
pub use manager::{LoginResult, SessionManager};
