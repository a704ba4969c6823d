//! Role-based access control (RBAC) enforcement.

pub mod enforcer;
pub mod policies;

pub use enforcer::AccessControl;
pub use policies::{Capability, capabilities_of};
