//! Redis-based fixed-window rate limiter using a Lua script for atomicity.
//!
//! Suitable for multi-node deployments.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tracing::debug;

use warden_core::config::RateLimitRule;
use warden_core::result::AppResult;
use warden_core::traits::Clock;

use crate::redis_client::RedisClient;

use super::{Admission, RateLimitKey, RateLimiter};

/// Lua script for an atomic window admission.
///
/// KEYS[1] = window key
/// ARGV[1] = window length (millis)
/// ARGV[2] = max attempts per window
///
/// A full window is left untouched, so denied attempts do not count.
/// Returns { admitted (0/1), count, remaining_ttl_millis }.
const ADMIT_SCRIPT: &str = r#"
    local count = tonumber(redis.call('GET', KEYS[1]) or '0')
    local admitted = 0
    if count < tonumber(ARGV[2]) then
        count = redis.call('INCR', KEYS[1])
        admitted = 1
    end
    local ttl = redis.call('PTTL', KEYS[1])
    if ttl < 0 then
        redis.call('PEXPIRE', KEYS[1], ARGV[1])
        ttl = tonumber(ARGV[1])
    end
    return { admitted, count, ttl }
"#;

/// Rate limiter shared by every node through Redis.
#[derive(Debug, Clone)]
pub struct RedisRateLimiter {
    client: RedisClient,
    admit_script: redis::Script,
    clock: Arc<dyn Clock>,
}

impl RedisRateLimiter {
    pub fn new(client: RedisClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            admit_script: redis::Script::new(ADMIT_SCRIPT),
            clock,
        }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn admit(&self, key: &RateLimitKey, rule: RateLimitRule) -> AppResult<Admission> {
        let redis_key = self.client.prefixed_key(&format!("ratelimit:{key}"));
        let window_ms = rule.window()?.num_milliseconds();
        let mut conn = self.client.conn_mut();
        let script = self.admit_script.clone();

        let (admitted, count, ttl_ms): (i64, i64, i64) = self
            .client
            .bounded("rate limit script", async move {
                script
                    .key(&redis_key)
                    .arg(window_ms)
                    .arg(rule.max_attempts)
                    .invoke_async(&mut conn)
                    .await
            })
            .await?;

        let max = i64::from(rule.max_attempts);
        if admitted == 1 {
            Ok(Admission::Admitted {
                remaining: u32::try_from(max - count).unwrap_or(0),
            })
        } else {
            debug!(key = %key, count, "Rate limit window full");
            Ok(Admission::Denied {
                retry_after: self.clock.now() + Duration::milliseconds(ttl_ms.max(0)),
            })
        }
    }

    async fn sweep(&self) -> AppResult<usize> {
        // Window keys carry PEXPIRE; Redis evicts them.
        Ok(0)
    }
}
