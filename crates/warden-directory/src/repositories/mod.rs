//! User directory interface.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::result::AppResult;
use warden_core::types::PrincipalId;
use warden_entity::{NewPrincipal, Principal, Role, Status};

pub use memory::InMemoryUserRepository;

/// Access to principal records owned by the user directory.
///
/// Update methods return `NotFound` when the principal does not exist.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Find a principal by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Principal>>;

    /// Find a principal by primary key.
    async fn find_by_id(&self, id: PrincipalId) -> AppResult<Option<Principal>>;

    /// Create a principal. Fails with `Conflict` if the email is taken.
    async fn create(&self, principal: NewPrincipal) -> AppResult<Principal>;

    /// Replace the stored password hash.
    async fn update_password_hash(&self, id: PrincipalId, password_hash: &str) -> AppResult<()>;

    /// Change the account status.
    async fn update_status(&self, id: PrincipalId, status: Status) -> AppResult<()>;

    /// Change the role.
    async fn update_role(&self, id: PrincipalId, role: Role) -> AppResult<()>;

    /// Mark the email address as confirmed.
    async fn mark_email_verified(&self, id: PrincipalId) -> AppResult<()>;

    /// Update the last successful login timestamp.
    async fn record_login(&self, id: PrincipalId, at: DateTime<Utc>) -> AppResult<()>;
}
