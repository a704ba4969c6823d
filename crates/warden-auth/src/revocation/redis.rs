//! Redis-backed revocation store using `SET NX` and a Lua script for atomicity.
//!
//! Suitable for multi-node deployments. Entries carry absolute expiries so
//! Redis evicts them itself.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::AsyncCommands;
use tracing::debug;

use warden_core::result::AppResult;
use warden_core::traits::Clock;
use warden_core::types::{PrincipalId, TokenId};

use crate::redis_client::RedisClient;

use super::RevocationStore;

/// Lua script for the monotonic subject watermark.
///
/// KEYS[1] = watermark key
/// ARGV[1] = cutoff (unix millis)
/// ARGV[2] = retain-until (unix millis)
///
/// Returns:
///   1 = advanced
///   0 = existing watermark is already at or past the cutoff
const ADVANCE_WATERMARK_SCRIPT: &str = r#"
    local current = redis.call('GET', KEYS[1])
    if current and tonumber(current) >= tonumber(ARGV[1]) then
        return 0
    end
    redis.call('SET', KEYS[1], ARGV[1], 'PXAT', ARGV[2])
    return 1
"#;

/// Revocation store shared by every node through Redis.
#[derive(Debug, Clone)]
pub struct RedisRevocationStore {
    client: RedisClient,
    watermark_script: redis::Script,
    watermark_retention: Duration,
    clock: Arc<dyn Clock>,
}

impl RedisRevocationStore {
    /// `watermark_retention` should be the longest token lifetime.
    pub fn new(client: RedisClient, clock: Arc<dyn Clock>, watermark_retention: Duration) -> Self {
        Self {
            client,
            watermark_script: redis::Script::new(ADVANCE_WATERMARK_SCRIPT),
            watermark_retention,
            clock,
        }
    }

    fn token_key(&self, token_id: TokenId) -> String {
        self.client.prefixed_key(&format!("revoked:{token_id}"))
    }

    fn watermark_key(&self, subject_id: PrincipalId) -> String {
        self.client.prefixed_key(&format!("watermark:{subject_id}"))
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, token_id: TokenId, expires_at: DateTime<Utc>) -> AppResult<bool> {
        if expires_at <= self.clock.now() {
            return Ok(!self.is_revoked(token_id).await?);
        }

        let key = self.token_key(token_id);
        let mut conn = self.client.conn_mut();
        let reply: Option<String> = self
            .client
            .bounded("SET NX", async move {
                redis::cmd("SET")
                    .arg(&key)
                    .arg(1)
                    .arg("NX")
                    .arg("PXAT")
                    .arg(expires_at.timestamp_millis())
                    .query_async(&mut conn)
                    .await
            })
            .await?;

        Ok(reply.is_some())
    }

    async fn is_revoked(&self, token_id: TokenId) -> AppResult<bool> {
        let key = self.token_key(token_id);
        let mut conn = self.client.conn_mut();
        self.client
            .bounded("EXISTS", async move { conn.exists(&key).await })
            .await
    }

    async fn revoke_all_for_subject(
        &self,
        subject_id: PrincipalId,
        cutoff: DateTime<Utc>,
    ) -> AppResult<bool> {
        let key = self.watermark_key(subject_id);
        let retain_until = cutoff + self.watermark_retention;
        let mut conn = self.client.conn_mut();
        let script = self.watermark_script.clone();

        let advanced: i64 = self
            .client
            .bounded("watermark script", async move {
                script
                    .key(&key)
                    .arg(cutoff.timestamp_millis())
                    .arg(retain_until.timestamp_millis())
                    .invoke_async(&mut conn)
                    .await
            })
            .await?;

        Ok(advanced == 1)
    }

    async fn subject_watermark(&self, subject_id: PrincipalId) -> AppResult<Option<DateTime<Utc>>> {
        let key = self.watermark_key(subject_id);
        let mut conn = self.client.conn_mut();
        let millis: Option<i64> = self
            .client
            .bounded("GET", async move { conn.get(&key).await })
            .await?;

        Ok(millis.and_then(DateTime::from_timestamp_millis))
    }

    async fn sweep(&self) -> AppResult<usize> {
        // Keys carry PXAT expiries; Redis evicts them.
        debug!("Redis revocation sweep skipped");
        Ok(0)
    }
}
