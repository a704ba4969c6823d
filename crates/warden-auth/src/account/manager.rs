//! Account lifecycle: registration, password reset, email verification,
//! and administrative role and status changes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use warden_core::config::{AuthConfig, RateLimitConfig, RateLimitRule};
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::traits::Clock;
use warden_core::types::PrincipalId;
use warden_directory::{Notifier, UserRepository};
use warden_entity::{NewPrincipal, Principal, PrincipalSummary, Role, Status};

use crate::jwt::{JwtDecoder, JwtEncoder, TokenClaims, TokenType};
use crate::password::{PasswordHasher, PasswordValidator};
use crate::ratelimit::{RateLimitKey, RateLimiter};
use crate::rbac::{AccessControl, Capability};
use crate::revocation::{RevocationStore, watermark_cutoff};
use crate::session::AuthenticatedIdentity;
use crate::session::manager::{ensure_active, ensure_outranks};

/// Self-service registration input.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 64, message = "Username must be 3 to 64 characters"))]
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Manages accounts on behalf of their owners and of administrators.
#[derive(Clone)]
pub struct AccountManager {
    jwt_encoder: Arc<JwtEncoder>,
    jwt_decoder: Arc<JwtDecoder>,
    revocations: Arc<dyn RevocationStore>,
    limiter: Arc<dyn RateLimiter>,
    user_repo: Arc<dyn UserRepository>,
    notifier: Arc<dyn Notifier>,
    password_hasher: Arc<PasswordHasher>,
    password_validator: Arc<PasswordValidator>,
    access: AccessControl,
    clock: Arc<dyn Clock>,
    auth_config: AuthConfig,
    rate_limits: RateLimitConfig,
}

impl std::fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountManager")
            .field("auth_config", &self.auth_config)
            .field("rate_limits", &self.rate_limits)
            .finish()
    }
}

impl AccountManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jwt_encoder: Arc<JwtEncoder>,
        jwt_decoder: Arc<JwtDecoder>,
        revocations: Arc<dyn RevocationStore>,
        limiter: Arc<dyn RateLimiter>,
        user_repo: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
        password_hasher: Arc<PasswordHasher>,
        password_validator: Arc<PasswordValidator>,
        clock: Arc<dyn Clock>,
        auth_config: AuthConfig,
        rate_limits: RateLimitConfig,
    ) -> Self {
        Self {
            jwt_encoder,
            jwt_decoder,
            revocations,
            limiter,
            user_repo,
            notifier,
            password_hasher,
            password_validator,
            access: AccessControl::new(),
            clock,
            auth_config,
            rate_limits,
        }
    }

    /// Registers a new `user`-role account and sends a verification email.
    pub async fn register(&self, request: RegistrationRequest) -> AppResult<PrincipalSummary> {
        let request = RegistrationRequest {
            email: request.email.trim().to_lowercase(),
            username: request.username.trim().to_string(),
            ..request
        };

        request
            .validate()
            .map_err(|e| AppError::validation(format!("Invalid registration: {e}")))?;

        if request.password != request.password_confirm {
            return Err(AppError::validation("Password confirmation does not match"));
        }

        self.password_validator
            .validate(&request.password, &[&request.email, &request.username])?;

        // Cheap check before paying for the hash; `create` still enforces it.
        if self.user_repo.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::conflict("Email is already registered"));
        }

        let password_hash = self.password_hasher.hash(&request.password).await?;
        let principal = self
            .user_repo
            .create(NewPrincipal {
                email: request.email,
                username: request.username,
                password_hash,
                role: Role::User,
                status: Status::Active,
                email_verified: false,
                created_at: self.clock.now(),
            })
            .await?;

        info!(principal_id = %principal.id, "Principal registered");

        self.send_verification(&principal).await?;

        Ok(principal.summary())
    }

    /// Emails a single-use password reset link.
    ///
    /// Succeeds without sending anything for unknown or non-active emails.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let email = email.trim().to_lowercase();
        self.admit(
            RateLimitKey::password_reset(&email),
            self.rate_limits.password_reset,
        )
        .await?;

        let Some(principal) = self.user_repo.find_by_email(&email).await? else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };
        if !principal.is_active() {
            info!(principal_id = %principal.id, status = %principal.status, "Password reset skipped for non-active account");
            return Ok(());
        }

        let issued_at = self
            .revocations
            .issuance_time(principal.id, self.clock.now())
            .await?;
        let (token, claims) = self.jwt_encoder.issue_new(
            principal.id,
            principal.role,
            TokenType::PasswordReset,
            issued_at,
        )?;
        let link = link_with_token(&self.auth_config.password_reset_url, &token);
        self.notifier
            .send_password_reset_email(&principal, &link)
            .await;

        info!(principal_id = %principal.id, token_id = %claims.token_id, "Password reset issued");
        Ok(())
    }

    /// Sets a new password from a reset token and revokes every existing session.
    pub async fn confirm_password_reset(
        &self,
        reset_token: &str,
        new_password: &str,
        password_confirm: &str,
    ) -> AppResult<()> {
        let claims = self.decode_single_use(reset_token, TokenType::PasswordReset).await?;
        let principal = self.load_principal(claims.subject_id).await?;
        ensure_active(&principal)?;

        if new_password != password_confirm {
            return Err(AppError::validation("Password confirmation does not match"));
        }
        self.password_validator
            .validate(new_password, &[&principal.email, &principal.username])?;

        self.consume(&claims).await?;

        let hash = self.password_hasher.hash(new_password).await?;
        self.user_repo
            .update_password_hash(principal.id, &hash)
            .await?;
        self.revocations
            .revoke_all_for_subject(principal.id, watermark_cutoff(self.clock.now()))
            .await?;

        info!(principal_id = %principal.id, token_id = %claims.token_id, "Password reset completed");
        Ok(())
    }

    /// Emails a fresh verification link.
    ///
    /// Succeeds silently for unknown and already-verified emails.
    pub async fn request_email_verification(&self, email: &str) -> AppResult<()> {
        let email = email.trim().to_lowercase();
        self.admit(
            RateLimitKey::email_verification(&email),
            self.rate_limits.email_verification,
        )
        .await?;

        match self.user_repo.find_by_email(&email).await? {
            Some(principal) if !principal.email_verified => self.send_verification(&principal).await,
            Some(principal) => {
                info!(principal_id = %principal.id, "Email already verified");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Marks the email of the token's subject as verified.
    pub async fn verify_email(&self, verification_token: &str) -> AppResult<PrincipalSummary> {
        let claims = self
            .decode_single_use(verification_token, TokenType::EmailVerification)
            .await?;
        let principal = self.load_principal(claims.subject_id).await?;

        self.consume(&claims).await?;

        if !principal.email_verified {
            self.user_repo.mark_email_verified(principal.id).await?;
        }

        info!(principal_id = %principal.id, token_id = %claims.token_id, "Email verified");

        let mut summary = principal.summary();
        summary.email_verified = true;
        Ok(summary)
    }

    /// Changes another principal's role and revokes their sessions so the
    /// new role applies to every future token.
    pub async fn change_role(
        &self,
        actor: &AuthenticatedIdentity,
        target: PrincipalId,
        role: Role,
    ) -> AppResult<()> {
        self.access.require(actor, Capability::UpdateUserRole)?;
        if actor.subject_id == target {
            return Err(AppError::forbidden("Cannot change your own role"));
        }

        let principal = self.load_principal(target).await?;
        if principal.role == role {
            return Ok(());
        }

        self.user_repo.update_role(target, role).await?;
        self.revocations
            .revoke_all_for_subject(target, watermark_cutoff(self.clock.now()))
            .await?;

        info!(
            actor_id = %actor.subject_id,
            target_id = %target,
            from = %principal.role,
            to = %role,
            "Role changed"
        );
        Ok(())
    }

    /// Changes another principal's status.
    ///
    /// Blocking needs `block_user`; any other transition needs
    /// `update_user_status`. The actor must outrank the target. Leaving
    /// `active` revokes every session.
    pub async fn change_status(
        &self,
        actor: &AuthenticatedIdentity,
        target: PrincipalId,
        status: Status,
    ) -> AppResult<()> {
        let capability = match status {
            Status::Blocked => Capability::BlockUser,
            Status::Active | Status::Inactive => Capability::UpdateUserStatus,
        };
        self.access.require(actor, capability)?;

        if actor.subject_id == target {
            return Err(AppError::forbidden("Cannot change your own status"));
        }

        let principal = self.load_principal(target).await?;
        ensure_outranks(actor, &principal)?;
        if principal.status == status {
            return Ok(());
        }

        self.user_repo.update_status(target, status).await?;
        if status != Status::Active {
            self.revocations
                .revoke_all_for_subject(target, watermark_cutoff(self.clock.now()))
                .await?;
        }

        info!(
            actor_id = %actor.subject_id,
            target_id = %target,
            from = %principal.status,
            to = %status,
            "Status changed"
        );
        Ok(())
    }

    async fn send_verification(&self, principal: &Principal) -> AppResult<()> {
        let issued_at = self
            .revocations
            .issuance_time(principal.id, self.clock.now())
            .await?;
        let (token, claims) = self.jwt_encoder.issue_new(
            principal.id,
            principal.role,
            TokenType::EmailVerification,
            issued_at,
        )?;
        let link = link_with_token(&self.auth_config.email_verification_url, &token);
        self.notifier
            .send_verification_email(principal, &link)
            .await;
        info!(principal_id = %principal.id, token_id = %claims.token_id, "Verification issued");
        Ok(())
    }

    /// Decodes a single-use token and rejects it if already revoked.
    async fn decode_single_use(&self, token: &str, expected: TokenType) -> AppResult<TokenClaims> {
        let claims = self.jwt_decoder.decode_as(token, expected)?;
        self.revocations.check(&claims).await?;
        Ok(claims)
    }

    /// Atomically marks a single-use token as spent.
    async fn consume(&self, claims: &TokenClaims) -> AppResult<()> {
        if self
            .revocations
            .revoke(claims.token_id, claims.expires_at)
            .await?
        {
            Ok(())
        } else {
            warn!(
                subject_id = %claims.subject_id,
                token_id = %claims.token_id,
                token_type = %claims.token_type,
                "Single-use token presented twice"
            );
            Err(AppError::token_revoked("Token has already been used"))
        }
    }

    async fn load_principal(&self, id: PrincipalId) -> AppResult<Principal> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Principal {id} not found")))
    }

    async fn admit(&self, key: RateLimitKey, rule: RateLimitRule) -> AppResult<()> {
        let admission = self.limiter.admit(&key, rule).await?;
        if !admission.is_admitted() {
            warn!(action = key.action.as_str(), "Rate limit exceeded");
        }
        admission.into_result(&key)
    }
}

fn link_with_token(base: &str, token: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}token={token}")
}
