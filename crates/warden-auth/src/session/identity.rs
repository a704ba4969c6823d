//! The identity attached to an authenticated request.

use chrono::{DateTime, Utc};
use serde::Serialize;

use warden_core::types::{PrincipalId, TokenId};
use warden_entity::Role;

/// Result of validating an access token.
///
/// `role` is the principal's role at validation time, not the one embedded
/// in the token, so demotions take effect on the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub subject_id: PrincipalId,
    pub role: Role,
    /// Id of the presented access token.
    pub token_id: TokenId,
    /// Expiry of the presented access token.
    pub expires_at: DateTime<Utc>,
}
