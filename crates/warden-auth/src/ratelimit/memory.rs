//! In-memory fixed-window rate limiter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use warden_core::config::RateLimitRule;
use warden_core::result::AppResult;
use warden_core::traits::Clock;

use super::{Admission, RateLimitKey, RateLimiter};

/// Entry in the rate limit map.
#[derive(Debug, Clone, Copy)]
struct Window {
    start: DateTime<Utc>,
    /// When the window closes; recorded so sweeps need no rule lookup.
    end: DateTime<Utc>,
    count: u32,
}

/// Rate limiter keeping one window per key in a `DashMap`.
#[derive(Debug, Clone)]
pub struct MemoryRateLimiter {
    windows: Arc<DashMap<RateLimitKey, Window>>,
    clock: Arc<dyn Clock>,
}

impl MemoryRateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Number of tracked windows, elapsed or not.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn admit(&self, key: &RateLimitKey, rule: RateLimitRule) -> AppResult<Admission> {
        let now = self.clock.now();
        let length = rule.window()?;
        let fresh = Window {
            start: now,
            end: now + length,
            count: 0,
        };

        let mut window = self.windows.entry(key.clone()).or_insert(fresh);
        if now >= window.end {
            *window = fresh;
        }

        if window.count < rule.max_attempts {
            window.count += 1;
            Ok(Admission::Admitted {
                remaining: rule.max_attempts - window.count,
            })
        } else {
            debug!(key = %key, count = window.count, "Rate limit window full");
            Ok(Admission::Denied {
                retry_after: window.start + length,
            })
        }
    }

    async fn sweep(&self) -> AppResult<usize> {
        let now = self.clock.now();
        let mut removed = 0usize;
        self.windows.retain(|_, window| {
            let keep = window.end > now;
            removed += usize::from(!keep);
            keep
        });
        Ok(removed)
    }
}
