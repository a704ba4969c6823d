//! Outbound notification interface.

use async_trait::async_trait;
use tracing::info;

use warden_entity::Principal;

/// Delivers account emails.
///
/// Delivery is fire-and-forget from the caller's point of view: failures
/// are the implementation's to log and retry.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Send a link that confirms ownership of the principal's email.
    async fn send_verification_email(&self, principal: &Principal, link: &str);

    /// Send a link that lets the principal choose a new password.
    async fn send_password_reset_email(&self, principal: &Principal, link: &str);
}

/// Notifier that only records that a message would have been sent.
///
/// Links carry bearer tokens, so they are not logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send_verification_email(&self, principal: &Principal, _link: &str) {
        info!(principal_id = %principal.id, "Verification email queued");
    }

    async fn send_password_reset_email(&self, principal: &Principal, _link: &str) {
        info!(principal_id = %principal.id, "Password reset email queued");
    }
}
