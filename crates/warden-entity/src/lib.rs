//! # warden-entity
//!
//! Domain entities for Warden. A [`Principal`] is owned by the external user
//! directory; the authentication core only reads it and asks the directory
//! to update it.

pub mod principal;

pub use principal::{NewPrincipal, Principal, PrincipalSummary, Role, Status};
