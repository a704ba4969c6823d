//! Role-to-capability mapping definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use warden_core::error::AppError;
use warden_entity::Role;

/// Something an authenticated principal may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    // Own account
    /// Read one's own profile.
    ViewProfile,
    /// Edit one's own profile.
    UpdateProfile,
    /// Change one's own password.
    ChangePassword,
    /// Ask for a new verification email.
    RequestEmailVerification,

    // Moderation
    /// List every account.
    ListAllUsers,
    /// Read another account's details.
    ViewUserDetails,
    /// Block another account.
    BlockUser,

    // Administration
    /// Change another account's role.
    UpdateUserRole,
    /// Change another account's status.
    UpdateUserStatus,
    /// Delete another account.
    DeleteUser,
    /// Sign another account out everywhere.
    RevokeUserSessions,
}

impl Capability {
    pub const ALL: [Capability; 11] = [
        Capability::ViewProfile,
        Capability::UpdateProfile,
        Capability::ChangePassword,
        Capability::RequestEmailVerification,
        Capability::ListAllUsers,
        Capability::ViewUserDetails,
        Capability::BlockUser,
        Capability::UpdateUserRole,
        Capability::UpdateUserStatus,
        Capability::DeleteUser,
        Capability::RevokeUserSessions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewProfile => "view_profile",
            Self::UpdateProfile => "update_profile",
            Self::ChangePassword => "change_password",
            Self::RequestEmailVerification => "request_email_verification",
            Self::ListAllUsers => "list_all_users",
            Self::ViewUserDetails => "view_user_details",
            Self::BlockUser => "block_user",
            Self::UpdateUserRole => "update_user_role",
            Self::UpdateUserStatus => "update_user_status",
            Self::DeleteUser => "delete_user",
            Self::RevokeUserSessions => "revoke_user_sessions",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown capability: '{s}'")))
    }
}

/// Granted to every authenticated principal.
const USER_CAPABILITIES: &[Capability] = &[
    Capability::ViewProfile,
    Capability::UpdateProfile,
    Capability::ChangePassword,
    Capability::RequestEmailVerification,
];

/// Granted to moderators on top of the user set.
const MODERATOR_CAPABILITIES: &[Capability] = &[
    Capability::ListAllUsers,
    Capability::ViewUserDetails,
    Capability::BlockUser,
];

/// Granted to admins on top of the moderator set.
const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::UpdateUserRole,
    Capability::UpdateUserStatus,
    Capability::DeleteUser,
    Capability::RevokeUserSessions,
];

/// Static role table. `admin ⊇ moderator ⊇ user`.
pub fn role_grants(role: Role, capability: Capability) -> bool {
    let tiers: &[&[Capability]] = match role {
        Role::User => &[USER_CAPABILITIES],
        Role::Moderator => &[USER_CAPABILITIES, MODERATOR_CAPABILITIES],
        Role::Admin => &[USER_CAPABILITIES, MODERATOR_CAPABILITIES, ADMIN_CAPABILITIES],
    };
    tiers.iter().any(|tier| tier.contains(&capability))
}

/// Every capability of a role, in table order.
pub fn capabilities_of(role: Role) -> Vec<Capability> {
    Capability::ALL
        .into_iter()
        .filter(|c| role_grants(role, *c))
        .collect()
}
