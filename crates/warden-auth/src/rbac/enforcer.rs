//! RBAC enforcement logic: checks whether an identity holds a capability.

use warden_core::error::AppError;
use warden_entity::Role;

use crate::session::AuthenticatedIdentity;

use super::policies::{Capability, role_grants};

/// Evaluates the static role table for authenticated requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessControl;

impl AccessControl {
    pub fn new() -> Self {
        Self
    }

    /// Whether the role holds the capability.
    pub fn can(&self, role: Role, capability: Capability) -> bool {
        role_grants(role, capability)
    }

    /// Returns `Ok(())` if allowed, or `Forbidden` if the role lacks the capability.
    pub fn require(
        &self,
        identity: &AuthenticatedIdentity,
        capability: Capability,
    ) -> Result<(), AppError> {
        if self.can(identity.role, capability) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "Role '{}' does not have capability '{capability}'",
                identity.role
            )))
        }
    }

    /// Like [`require`](Self::require), but `Unauthenticated` when no identity was presented.
    pub fn require_identity<'a>(
        &self,
        identity: Option<&'a AuthenticatedIdentity>,
        capability: Capability,
    ) -> Result<&'a AuthenticatedIdentity, AppError> {
        let identity =
            identity.ok_or_else(|| AppError::unauthenticated("Authentication required"))?;
        self.require(identity, capability)?;
        Ok(identity)
    }
}
