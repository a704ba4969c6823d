//! Principal domain entities.

pub mod model;
pub mod role;
pub mod status;

pub use model::{NewPrincipal, Principal, PrincipalSummary};
pub use role::Role;
pub use status::Status;
