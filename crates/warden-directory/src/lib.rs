//! # warden-directory
//!
//! Interfaces to the collaborators that own user data and outbound mail,
//! plus in-process implementations used by tests and single-node
//! deployments.

pub mod notifier;
pub mod repositories;

pub use notifier::{Notifier, TracingNotifier};
pub use repositories::{InMemoryUserRepository, UserRepository};
