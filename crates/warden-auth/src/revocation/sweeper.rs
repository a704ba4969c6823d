//! Periodic purge of expired revocation records and rate-limit windows.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use warden_core::result::AppResult;

use crate::ratelimit::RateLimiter;

use super::RevocationStore;

/// Counts from one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub revocations: usize,
    pub rate_limit_windows: usize,
}

/// Runs sweeps of both stores on a fixed interval.
#[derive(Clone)]
pub struct RevocationSweeper {
    revocations: Arc<dyn RevocationStore>,
    limiter: Arc<dyn RateLimiter>,
    interval: Duration,
}

impl std::fmt::Debug for RevocationSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationSweeper")
            .field("interval", &self.interval)
            .finish()
    }
}

impl RevocationSweeper {
    pub fn new(
        revocations: Arc<dyn RevocationStore>,
        limiter: Arc<dyn RateLimiter>,
        interval: Duration,
    ) -> Self {
        Self {
            revocations,
            limiter,
            interval,
        }
    }

    /// Runs a single sweep cycle.
    pub async fn run_once(&self) -> AppResult<SweepReport> {
        let revocations = self.revocations.sweep().await?;
        let rate_limit_windows = self.limiter.sweep().await?;
        let report = SweepReport {
            revocations,
            rate_limit_windows,
        };
        debug!(
            revocations = report.revocations,
            rate_limit_windows = report.rate_limit_windows,
            "Sweep cycle completed"
        );
        Ok(report)
    }

    /// Spawns the sweep loop on the current runtime.
    ///
    /// Failed cycles are logged and retried on the next tick. Abort the
    /// returned handle to stop the loop.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(interval_secs = self.interval.as_secs(), "Starting revocation sweeper");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    error!(error = %e, "Sweep cycle failed");
                }
            }
        })
    }
}
