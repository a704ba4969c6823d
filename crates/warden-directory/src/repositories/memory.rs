//! In-memory user directory backed by `DashMap`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::types::PrincipalId;
use warden_entity::{NewPrincipal, Principal, Role, Status};

use super::UserRepository;

/// Directory held in process memory. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    by_id: Arc<DashMap<PrincipalId, Principal>>,
    /// Lower-cased email -> principal id. Guards email uniqueness.
    by_email: Arc<DashMap<String, PrincipalId>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored principals.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn modify(&self, id: PrincipalId, apply: impl FnOnce(&mut Principal)) -> AppResult<()> {
        match self.by_id.get_mut(&id) {
            Some(mut principal) => {
                apply(&mut principal);
                Ok(())
            }
            None => Err(AppError::not_found(format!("Principal {id} not found"))),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Principal>> {
        let key = email.trim().to_lowercase();
        let Some(id) = self.by_email.get(&key).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.by_id.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: PrincipalId) -> AppResult<Option<Principal>> {
        Ok(self.by_id.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, new: NewPrincipal) -> AppResult<Principal> {
        let email = new.email.trim().to_lowercase();
        let principal = Principal {
            id: PrincipalId::new(),
            email: email.clone(),
            username: new.username,
            password_hash: new.password_hash,
            role: new.role,
            status: new.status,
            email_verified: new.email_verified,
            created_at: new.created_at,
            last_login_at: None,
        };

        match self.by_email.entry(email) {
            Entry::Occupied(_) => Err(AppError::conflict("Email is already registered")),
            Entry::Vacant(slot) => {
                self.by_id.insert(principal.id, principal.clone());
                slot.insert(principal.id);
                debug!(principal_id = %principal.id, "Principal created");
                Ok(principal)
            }
        }
    }

    async fn update_password_hash(&self, id: PrincipalId, password_hash: &str) -> AppResult<()> {
        self.modify(id, |p| p.password_hash = password_hash.to_string())
    }

    async fn update_status(&self, id: PrincipalId, status: Status) -> AppResult<()> {
        self.modify(id, |p| p.status = status)
    }

    async fn update_role(&self, id: PrincipalId, role: Role) -> AppResult<()> {
        self.modify(id, |p| p.role = role)
    }

    async fn mark_email_verified(&self, id: PrincipalId) -> AppResult<()> {
        self.modify(id, |p| p.email_verified = true)
    }

    async fn record_login(&self, id: PrincipalId, at: DateTime<Utc>) -> AppResult<()> {
        self.modify(id, |p| p.last_login_at = Some(at))
    }
}
