//! Per-action rate-limit configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::duration_setting;
use crate::result::AppResult;

/// Maximum attempts within a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub max_attempts: u32,
    pub window_seconds: u64,
}

impl RateLimitRule {
    pub const fn new(max_attempts: u32, window_seconds: u64) -> Self {
        Self {
            max_attempts,
            window_seconds,
        }
    }

    pub fn window(&self) -> AppResult<Duration> {
        duration_setting(
            "rate_limit window_seconds",
            self.window_seconds,
            Duration::try_seconds,
        )
    }
}

/// Rate limits for every throttled credential action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Login attempts per email and client address.
    #[serde(default = "default_login")]
    pub login: RateLimitRule,
    /// Password reset requests per email.
    #[serde(default = "default_password_reset")]
    pub password_reset: RateLimitRule,
    /// Refresh calls per subject.
    #[serde(default = "default_refresh")]
    pub refresh: RateLimitRule,
    /// Verification email requests per email.
    #[serde(default = "default_email_verification")]
    pub email_verification: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login: default_login(),
            password_reset: default_password_reset(),
            refresh: default_refresh(),
            email_verification: default_email_verification(),
        }
    }
}

fn default_login() -> RateLimitRule {
    RateLimitRule::new(5, 300)
}

fn default_password_reset() -> RateLimitRule {
    RateLimitRule::new(3, 3600)
}

fn default_refresh() -> RateLimitRule {
    RateLimitRule::new(30, 60)
}

fn default_email_verification() -> RateLimitRule {
    RateLimitRule::new(3, 3600)
}
