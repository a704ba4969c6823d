//! Principal entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::types::PrincipalId;

use super::role::Role;
use super::status::Status;

/// A registered account as stored by the user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Unique principal identifier.
    pub id: PrincipalId,
    /// Email address, stored lower-cased. Unique.
    pub email: String,
    /// Display name chosen at registration.
    pub username: String,
    /// Argon2id PHC string.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Authorization role.
    pub role: Role,
    /// Account status.
    pub status: Status,
    /// Whether the email address has been confirmed.
    pub email_verified: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Last successful login time.
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Principal {
    /// Check if the principal may hold valid credentials right now.
    pub fn is_active(&self) -> bool {
        self.status.can_login()
    }

    pub fn summary(&self) -> PrincipalSummary {
        PrincipalSummary::from(self)
    }
}

/// Data required to create a new principal.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub email: String,
    pub username: String,
    /// Pre-hashed password.
    pub password_hash: String,
    pub role: Role,
    pub status: Status,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// The public view of a principal returned alongside a fresh token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalSummary {
    pub id: PrincipalId,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub email_verified: bool,
}

impl From<&Principal> for PrincipalSummary {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            email: principal.email.clone(),
            username: principal.username.clone(),
            role: principal.role,
            email_verified: principal.email_verified,
        }
    }
}
