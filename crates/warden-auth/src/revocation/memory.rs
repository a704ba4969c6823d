//! In-memory revocation store for single-node deployments.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use warden_core::result::AppResult;
use warden_core::traits::Clock;
use warden_core::types::{PrincipalId, TokenId};

use super::RevocationStore;

#[derive(Debug, Clone, Copy)]
struct Watermark {
    cutoff: DateTime<Utc>,
    retain_until: DateTime<Utc>,
}

/// Revocation records in sharded concurrent maps.
///
/// Per-key atomicity comes from `DashMap`'s entry API; no global lock is
/// taken on the hot path.
#[derive(Debug, Clone)]
pub struct MemoryRevocationStore {
    /// Token id -> expiry of the revoked token.
    revoked: Arc<DashMap<TokenId, DateTime<Utc>>>,
    watermarks: Arc<DashMap<PrincipalId, Watermark>>,
    /// How long a watermark outlives its cutoff.
    watermark_retention: Duration,
    clock: Arc<dyn Clock>,
}

impl MemoryRevocationStore {
    /// `watermark_retention` should be the longest token lifetime.
    pub fn new(clock: Arc<dyn Clock>, watermark_retention: Duration) -> Self {
        Self {
            revoked: Arc::new(DashMap::new()),
            watermarks: Arc::new(DashMap::new()),
            watermark_retention,
            clock,
        }
    }

    /// Number of stored token records, expired or not.
    pub fn record_count(&self) -> usize {
        self.revoked.len()
    }

    /// Number of stored watermarks, expired or not.
    pub fn watermark_count(&self) -> usize {
        self.watermarks.len()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, token_id: TokenId, expires_at: DateTime<Utc>) -> AppResult<bool> {
        let now = self.clock.now();
        if expires_at <= now {
            // Already dead; nothing to record.
            return Ok(!self.is_revoked(token_id).await?);
        }

        match self.revoked.entry(token_id) {
            Entry::Occupied(mut existing) => {
                if *existing.get() <= now {
                    existing.insert(expires_at);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
                Ok(true)
            }
        }
    }

    async fn is_revoked(&self, token_id: TokenId) -> AppResult<bool> {
        let now = self.clock.now();
        let live = match self.revoked.get(&token_id) {
            Some(expires_at) => *expires_at > now,
            None => return Ok(false),
        };
        if !live {
            self.revoked.remove_if(&token_id, |_, expires_at| *expires_at <= now);
        }
        Ok(live)
    }

    async fn revoke_all_for_subject(
        &self,
        subject_id: PrincipalId,
        cutoff: DateTime<Utc>,
    ) -> AppResult<bool> {
        let now = self.clock.now();
        let retain_until = cutoff + self.watermark_retention;

        match self.watermarks.entry(subject_id) {
            Entry::Occupied(mut existing) => {
                let current = *existing.get();
                if current.retain_until > now && current.cutoff >= cutoff {
                    return Ok(false);
                }
                existing.insert(Watermark {
                    cutoff,
                    retain_until,
                });
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert(Watermark {
                    cutoff,
                    retain_until,
                });
                Ok(true)
            }
        }
    }

    async fn subject_watermark(&self, subject_id: PrincipalId) -> AppResult<Option<DateTime<Utc>>> {
        let now = self.clock.now();
        let current = match self.watermarks.get(&subject_id) {
            Some(mark) => *mark,
            None => return Ok(None),
        };
        if current.retain_until <= now {
            self.watermarks
                .remove_if(&subject_id, |_, mark| mark.retain_until <= now);
            return Ok(None);
        }
        Ok(Some(current.cutoff))
    }

    async fn sweep(&self) -> AppResult<usize> {
        let now = self.clock.now();
        let mut removed = 0usize;
        self.revoked.retain(|_, expires_at| {
            let keep = *expires_at > now;
            removed += usize::from(!keep);
            keep
        });
        self.watermarks.retain(|_, mark| {
            let keep = mark.retain_until > now;
            removed += usize::from(!keep);
            keep
        });

        debug!(removed, "Revocation sweep completed");
        Ok(removed)
    }
}
