//! Session lifecycle manager: login, logout, refresh token rotation.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{error, info, warn};

use warden_core::config::{AuthConfig, RateLimitConfig, RateLimitRule};
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::traits::Clock;
use warden_core::types::{PasswordRule, PrincipalId};
use warden_directory::UserRepository;
use warden_entity::{Principal, PrincipalSummary, Status};

use crate::jwt::{JwtDecoder, JwtEncoder, TokenPair, TokenType};
use crate::password::{PasswordHasher, PasswordValidator};
use crate::ratelimit::{RateLimitKey, RateLimiter};
use crate::rbac::{AccessControl, Capability};
use crate::revocation::{
    RevocationStore, issue_instant, revoked_by_watermark, watermark_cutoff,
};

use super::identity::AuthenticatedIdentity;

/// Result of a successful login.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LoginResult {
    /// Generated token pair.
    pub tokens: TokenPair,
    /// The authenticated principal.
    pub principal: PrincipalSummary,
}

/// Manages the complete credential session lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    /// JWT encoder for token generation.
    jwt_encoder: Arc<JwtEncoder>,
    /// JWT decoder for token validation.
    jwt_decoder: Arc<JwtDecoder>,
    /// Revoked token ids and subject watermarks.
    revocations: Arc<dyn RevocationStore>,
    /// Attempt counters.
    limiter: Arc<dyn RateLimiter>,
    /// User directory.
    user_repo: Arc<dyn UserRepository>,
    /// Password hasher.
    password_hasher: Arc<PasswordHasher>,
    /// Password policy.
    password_validator: Arc<PasswordValidator>,
    access: AccessControl,
    clock: Arc<dyn Clock>,
    /// Auth configuration.
    auth_config: AuthConfig,
    /// Per-action limits.
    rate_limits: RateLimitConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("auth_config", &self.auth_config)
            .field("rate_limits", &self.rate_limits)
            .finish()
    }
}

impl SessionManager {
    /// Creates a new session manager with all required dependencies.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jwt_encoder: Arc<JwtEncoder>,
        jwt_decoder: Arc<JwtDecoder>,
        revocations: Arc<dyn RevocationStore>,
        limiter: Arc<dyn RateLimiter>,
        user_repo: Arc<dyn UserRepository>,
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
            password_hasher,
            password_validator,
            access: AccessControl::new(),
            clock,
            auth_config,
            rate_limits,
        }
    }

    /// Performs the complete login flow:
    ///
    /// 1. Rate-limit per email and client address
    /// 2. Look up the principal by email
    /// 3. Verify the password (a dummy digest is verified for unknown emails)
    /// 4. Check the account status
    /// 5. Issue an access + refresh pair
    /// 6. Record the login
    ///
    /// Status is checked only after the password so that account state is
    /// not revealed to callers who do not know it.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client_ip: IpAddr,
    ) -> AppResult<LoginResult> {
        // Step 1: Admission
        self.admit(RateLimitKey::login(email, client_ip), self.rate_limits.login)
            .await?;

        // Step 2: Find principal
        let Some(principal) = self.user_repo.find_by_email(email).await? else {
            self.password_hasher.verify_dummy(password).await?;
            info!(client_ip = %client_ip, "Login failed: unknown email");
            return Err(AppError::invalid_credentials());
        };

        // Step 3: Verify password
        if !self
            .password_hasher
            .verify(password, &principal.password_hash)
            .await?
        {
            info!(principal_id = %principal.id, client_ip = %client_ip, "Login failed: wrong password");
            return Err(AppError::invalid_credentials());
        }

        // Step 4: Check status
        if let Err(e) = ensure_active(&principal) {
            warn!(
                principal_id = %principal.id,
                status = %principal.status,
                "Login refused for non-active account"
            );
            return Err(e);
        }

        // Step 5: Issue tokens
        let now = self.clock.now();
        let issued_at = self.revocations.issuance_time(principal.id, now).await?;
        let tokens = self
            .jwt_encoder
            .issue_pair(principal.id, principal.role, issued_at)?;

        // Step 6: Update last login
        if let Err(e) = self.user_repo.record_login(principal.id, now).await {
            error!(principal_id = %principal.id, error = %e, "Failed to record last login");
        }

        info!(principal_id = %principal.id, role = %principal.role, "Login successful");

        Ok(LoginResult {
            tokens,
            principal: principal.summary(),
        })
    }

    /// Exchanges a refresh token for a new pair, revoking the presented one.
    ///
    /// 1. Decode and require a refresh token
    /// 2. Reject revoked tokens and tokens at or below the subject watermark
    /// 3. Rate-limit per subject
    /// 4. Look up the principal; it must still be active
    /// 5. Atomically revoke the presented token; losing the race is `TokenRevoked`
    /// 6. Issue a new pair with the principal's current role
    ///
    /// The new pair is dated from the clock and watermark read in step 2, so
    /// a bulk revocation starting after that read also covers it. One whose
    /// cutoff predates the read but whose write lands after it does not.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        // Step 1: Decode
        let claims = self
            .jwt_decoder
            .decode_as(refresh_token, TokenType::Refresh)?;
        let subject_id = claims.subject_id;

        // Step 2: Revocation state
        if self.revocations.is_revoked(claims.token_id).await? {
            warn!(
                subject_id = %subject_id,
                token_id = %claims.token_id,
                "Revoked refresh token presented again; possible token theft"
            );
            if self.auth_config.revoke_family_on_reuse {
                self.revocations
                    .revoke_all_for_subject(subject_id, watermark_cutoff(self.clock.now()))
                    .await?;
                warn!(subject_id = %subject_id, "All sessions revoked after refresh token reuse");
            }
            return Err(AppError::token_revoked("Refresh token has already been used"));
        }
        let watermark = self.revocations.subject_watermark(subject_id).await?;
        if revoked_by_watermark(claims.issued_at, watermark) {
            return Err(AppError::token_revoked(
                "Refresh token was issued before the subject's sessions were revoked",
            ));
        }
        let issued_at = issue_instant(self.clock.now(), watermark);

        // Step 3: Admission (only live tokens count against the subject)
        self.admit(RateLimitKey::refresh(subject_id), self.rate_limits.refresh)
            .await?;

        // Step 4: Current principal (role may have changed)
        let principal = self.load_active(subject_id).await?;

        // Step 5: Rotate
        if !self
            .revocations
            .revoke(claims.token_id, claims.expires_at)
            .await?
        {
            warn!(
                subject_id = %subject_id,
                token_id = %claims.token_id,
                "Concurrent refresh lost the rotation race"
            );
            return Err(AppError::token_revoked("Refresh token has already been used"));
        }

        // Step 6: New pair
        let tokens = self
            .jwt_encoder
            .issue_pair(principal.id, principal.role, issued_at)?;

        info!(
            subject_id = %subject_id,
            rotated_token_id = %claims.token_id,
            "Token refreshed"
        );

        Ok(tokens)
    }

    /// Revokes the presented refresh token.
    ///
    /// Idempotent: an expired or already-revoked token succeeds. Malformed
    /// tokens and access tokens are rejected.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let claims = match self.jwt_decoder.decode(refresh_token) {
            Ok(claims) => claims,
            Err(e) if e.kind == warden_core::ErrorKind::ExpiredToken => {
                info!("Logout with an expired token; nothing to revoke");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if claims.token_type != TokenType::Refresh {
            return Err(AppError::wrong_token_type(format!(
                "Invalid token type: expected refresh token, got {}",
                claims.token_type
            )));
        }

        let revoked_now = self
            .revocations
            .revoke(claims.token_id, claims.expires_at)
            .await?;

        info!(
            subject_id = %claims.subject_id,
            token_id = %claims.token_id,
            already_revoked = !revoked_now,
            "Logout completed"
        );

        Ok(())
    }

    /// Revokes every token of the subject issued before now.
    pub async fn logout_all(&self, subject_id: PrincipalId) -> AppResult<()> {
        self.revocations
            .revoke_all_for_subject(subject_id, watermark_cutoff(self.clock.now()))
            .await?;
        info!(subject_id = %subject_id, "All sessions revoked");
        Ok(())
    }

    /// Signs another principal out everywhere on behalf of an administrator.
    pub async fn revoke_sessions_of(
        &self,
        actor: &AuthenticatedIdentity,
        target: PrincipalId,
    ) -> AppResult<()> {
        self.access.require(actor, Capability::RevokeUserSessions)?;

        let principal = self
            .user_repo
            .find_by_id(target)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Principal {target} not found")))?;
        ensure_outranks(actor, &principal)?;

        self.revocations
            .revoke_all_for_subject(target, watermark_cutoff(self.clock.now()))
            .await?;
        info!(actor_id = %actor.subject_id, target_id = %target, "Sessions revoked by administrator");
        Ok(())
    }

    /// Changes the password and revokes every previously issued token.
    pub async fn change_password(
        &self,
        subject_id: PrincipalId,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let principal = self
            .user_repo
            .find_by_id(subject_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Principal {subject_id} not found")))?;

        if !self
            .password_hasher
            .verify(current_password, &principal.password_hash)
            .await?
        {
            warn!(subject_id = %subject_id, "Password change refused: wrong current password");
            return Err(AppError::invalid_credentials());
        }

        let mut failed = self
            .password_validator
            .check(new_password, &[&principal.email, &principal.username]);
        if current_password == new_password {
            failed.push(PasswordRule::SameAsCurrent);
        }
        if !failed.is_empty() {
            return Err(AppError::weak_password(failed));
        }

        let hash = self.password_hasher.hash(new_password).await?;
        self.user_repo
            .update_password_hash(subject_id, &hash)
            .await?;
        self.revocations
            .revoke_all_for_subject(subject_id, watermark_cutoff(self.clock.now()))
            .await?;

        info!(subject_id = %subject_id, "Password changed; previous sessions revoked");
        Ok(())
    }

    /// Validates an access token for one request.
    pub async fn authenticate(&self, access_token: &str) -> AppResult<AuthenticatedIdentity> {
        let claims = self
            .jwt_decoder
            .decode_as(access_token, TokenType::Access)?;
        self.revocations.check(&claims).await?;

        let principal = self.load_active(claims.subject_id).await?;

        Ok(AuthenticatedIdentity {
            subject_id: principal.id,
            role: principal.role,
            token_id: claims.token_id,
            expires_at: claims.expires_at,
        })
    }

    /// [`authenticate`](Self::authenticate) and require a capability.
    pub async fn authorize(
        &self,
        access_token: &str,
        capability: Capability,
    ) -> AppResult<AuthenticatedIdentity> {
        let identity = self.authenticate(access_token).await?;
        if let Err(e) = self.access.require(&identity, capability) {
            info!(
                subject_id = %identity.subject_id,
                role = %identity.role,
                capability = %capability,
                "Access denied"
            );
            return Err(e);
        }
        Ok(identity)
    }

    async fn admit(&self, key: RateLimitKey, rule: RateLimitRule) -> AppResult<()> {
        let admission = self.limiter.admit(&key, rule).await?;
        if !admission.is_admitted() {
            warn!(action = key.action.as_str(), "Rate limit exceeded");
        }
        admission.into_result(&key)
    }

    async fn load_active(&self, subject_id: PrincipalId) -> AppResult<Principal> {
        let principal = self
            .user_repo
            .find_by_id(subject_id)
            .await?
            .ok_or_else(|| AppError::unauthenticated("Principal no longer exists"))?;
        ensure_active(&principal)?;
        Ok(principal)
    }
}

/// Requires the actor's current role to be strictly above the target's.
pub(crate) fn ensure_outranks(actor: &AuthenticatedIdentity, target: &Principal) -> AppResult<()> {
    if actor.role.outranks(&target.role) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "A {} cannot act on a {} account",
            actor.role, target.role
        )))
    }
}

/// Maps a non-active status to its credential error.
pub(crate) fn ensure_active(principal: &Principal) -> AppResult<()> {
    match principal.status {
        Status::Active => Ok(()),
        Status::Blocked => Err(AppError::account_blocked()),
        Status::Inactive => Err(AppError::account_inactive()),
    }
}
