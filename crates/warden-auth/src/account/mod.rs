//! Account lifecycle outside of sessions: registration, password reset,
//! email verification, and administrative changes.

pub mod manager;

pub use manager::{AccountManager, RegistrationRequest};
