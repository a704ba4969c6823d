//! Fixed-window rate limiting of credential actions.
//!
//! Provides either:
//! - Redis `INCR` + `PEXPIRE` in a Lua script (for multi-node deployments)
//! - A sharded in-memory map (for single-node deployments)

pub mod memory;
#[cfg(feature = "redis-store")]
pub mod redis;

use std::fmt;
use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::config::RateLimitRule;
use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_core::types::PrincipalId;

pub use memory::MemoryRateLimiter;
#[cfg(feature = "redis-store")]
pub use self::redis::RedisRateLimiter;

/// The throttled action a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    Login,
    PasswordReset,
    Refresh,
    EmailVerification,
}

impl RateLimitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::PasswordReset => "password_reset",
            Self::Refresh => "refresh",
            Self::EmailVerification => "email_verification",
        }
    }

    /// Error kind surfaced when this action is denied.
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            Self::Login => ErrorKind::LoginRateLimited,
            Self::PasswordReset => ErrorKind::ResetRateLimited,
            Self::Refresh => ErrorKind::RefreshRateLimited,
            Self::EmailVerification => ErrorKind::VerificationRateLimited,
        }
    }
}

/// Identity + action a window is counted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub action: RateLimitAction,
    pub identity: String,
}

impl RateLimitKey {
    /// Login attempts are counted per email and client address.
    pub fn login(email: &str, client_ip: IpAddr) -> Self {
        Self {
            action: RateLimitAction::Login,
            identity: format!("{}|{client_ip}", normalize_email(email)),
        }
    }

    pub fn password_reset(email: &str) -> Self {
        Self {
            action: RateLimitAction::PasswordReset,
            identity: normalize_email(email),
        }
    }

    pub fn refresh(subject_id: PrincipalId) -> Self {
        Self {
            action: RateLimitAction::Refresh,
            identity: subject_id.to_string(),
        }
    }

    pub fn email_verification(email: &str) -> Self {
        Self {
            action: RateLimitAction::EmailVerification,
            identity: normalize_email(email),
        }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action.as_str(), self.identity)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The attempt is counted; `remaining` more fit in this window.
    Admitted { remaining: u32 },
    /// The window is full until `retry_after`.
    Denied { retry_after: DateTime<Utc> },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }

    /// Converts a denial into the action's rate-limit error.
    pub fn into_result(self, key: &RateLimitKey) -> AppResult<()> {
        match self {
            Self::Admitted { .. } => Ok(()),
            Self::Denied { retry_after } => {
                Err(AppError::rate_limited(key.action.error_kind(), retry_after))
            }
        }
    }
}

/// Attempt counter per key inside fixed windows.
#[async_trait]
pub trait RateLimiter: Send + Sync + std::fmt::Debug + 'static {
    /// Counts one attempt under `key`.
    ///
    /// Admits exactly `rule.max_attempts` calls per window; later calls are
    /// denied until `window_start + rule.window`.
    async fn admit(&self, key: &RateLimitKey, rule: RateLimitRule) -> AppResult<Admission>;

    /// Purges windows that have elapsed. Returns the number removed.
    async fn sweep(&self) -> AppResult<usize>;
}
