//! Two-tier token revocation.
//!
//! Individual token ids are recorded until their natural expiry (logout,
//! refresh rotation, consumed single-use tokens). A per-subject watermark
//! revokes every token of a subject issued before it (password change,
//! role change, blocking, logout everywhere).
//!
//! Provides either:
//! - Redis `SET NX` plus a Lua watermark script (for multi-node deployments)
//! - Sharded in-memory maps (for single-node deployments)

pub mod memory;
#[cfg(feature = "redis-store")]
pub mod redis;
pub mod sweeper;

use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};

use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::types::{PrincipalId, TokenId};

use crate::jwt::TokenClaims;

pub use memory::MemoryRevocationStore;
#[cfg(feature = "redis-store")]
pub use self::redis::RedisRevocationStore;
pub use sweeper::{RevocationSweeper, SweepReport};

/// Watermark cutoff for a revocation happening at `now`.
///
/// Token `issued_at` values carry millisecond precision, so the cutoff is
/// truncated to match. Every token issued at or before the cutoff is revoked.
pub fn watermark_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(Duration::milliseconds(1)).unwrap_or(now)
}

/// Whether a token issued at `issued_at` falls under `watermark`.
pub fn revoked_by_watermark(issued_at: DateTime<Utc>, watermark: Option<DateTime<Utc>>) -> bool {
    watermark.is_some_and(|cutoff| issued_at <= cutoff)
}

/// Issuance instant for a new token given the subject's watermark.
///
/// Strictly after the watermark, so a token minted in the same millisecond
/// as a bulk revocation is not caught by it.
pub fn issue_instant(now: DateTime<Utc>, watermark: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = watermark_cutoff(now);
    match watermark {
        Some(cutoff) if cutoff >= now => cutoff + Duration::milliseconds(1),
        _ => now,
    }
}

/// Storage for revoked token ids and subject watermarks.
///
/// Absence of an entry always means "not revoked".
#[async_trait]
pub trait RevocationStore: Send + Sync + std::fmt::Debug + 'static {
    /// Records `token_id` as revoked until `expires_at`.
    ///
    /// Returns `true` if this call revoked it and `false` if it was already
    /// revoked. Exactly one of several concurrent callers sees `true`.
    async fn revoke(&self, token_id: TokenId, expires_at: DateTime<Utc>) -> AppResult<bool>;

    /// Whether `token_id` is currently recorded as revoked.
    async fn is_revoked(&self, token_id: TokenId) -> AppResult<bool>;

    /// Advances the subject's watermark to `cutoff`; tokens issued at or
    /// before it are revoked.
    ///
    /// Never moves a watermark backwards. Returns `true` if it advanced.
    async fn revoke_all_for_subject(
        &self,
        subject_id: PrincipalId,
        cutoff: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// The subject's current watermark, if any.
    async fn subject_watermark(&self, subject_id: PrincipalId) -> AppResult<Option<DateTime<Utc>>>;

    /// Purges entries whose lifetime has passed. Returns the number removed.
    async fn sweep(&self) -> AppResult<usize>;

    /// Fails with `TokenRevoked` if the token is revoked by id or watermark.
    async fn check(&self, claims: &TokenClaims) -> AppResult<()> {
        if self.is_revoked(claims.token_id).await? {
            return Err(AppError::token_revoked("Token has been revoked"));
        }
        let watermark = self.subject_watermark(claims.subject_id).await?;
        if revoked_by_watermark(claims.issued_at, watermark) {
            return Err(AppError::token_revoked(
                "Token was issued before the subject's sessions were revoked",
            ));
        }
        Ok(())
    }

    /// When a token for `subject_id` minted at `now` should say it was issued.
    async fn issuance_time(
        &self,
        subject_id: PrincipalId,
        now: DateTime<Utc>,
    ) -> AppResult<DateTime<Utc>> {
        let watermark = self.subject_watermark(subject_id).await?;
        Ok(issue_instant(now, watermark))
    }
}
