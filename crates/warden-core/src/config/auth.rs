//! Token signing and lifetime configuration.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::duration_setting;
use crate::result::AppResult;

/// Minimum accepted length of the HMAC signing secret, in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

/// Token signing, lifetimes, and link settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for HS256 signing. Loaded once at startup.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Value of the `iss` claim; tokens from another issuer are rejected.
    #[serde(default = "default_issuer")]
    pub jwt_issuer: String,
    /// Access token lifetime in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: u64,
    /// Refresh token lifetime in hours.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_hours: u64,
    /// Password reset token lifetime in minutes.
    #[serde(default = "default_reset_ttl")]
    pub reset_token_ttl_minutes: u64,
    /// Email verification token lifetime in hours.
    #[serde(default = "default_verification_ttl")]
    pub verification_token_ttl_hours: u64,
    /// How far in the future a token's `iat` may lie before it is rejected.
    #[serde(default = "default_leeway")]
    pub clock_skew_leeway_seconds: u64,
    /// Revoke every session of a subject when a rotated refresh token is replayed.
    #[serde(default = "default_true")]
    pub revoke_family_on_reuse: bool,
    /// Base URL of the password reset page; the token is appended as `?token=`.
    #[serde(default = "default_reset_url")]
    pub password_reset_url: String,
    /// Base URL of the email verification page; the token is appended as `?token=`.
    #[serde(default = "default_verification_url")]
    pub email_verification_url: String,
}

impl AuthConfig {
    pub fn access_ttl(&self) -> AppResult<Duration> {
        duration_setting(
            "auth.access_token_ttl_minutes",
            self.access_token_ttl_minutes,
            Duration::try_minutes,
        )
    }

    pub fn refresh_ttl(&self) -> AppResult<Duration> {
        duration_setting(
            "auth.refresh_token_ttl_hours",
            self.refresh_token_ttl_hours,
            Duration::try_hours,
        )
    }

    pub fn reset_ttl(&self) -> AppResult<Duration> {
        duration_setting(
            "auth.reset_token_ttl_minutes",
            self.reset_token_ttl_minutes,
            Duration::try_minutes,
        )
    }

    pub fn verification_ttl(&self) -> AppResult<Duration> {
        duration_setting(
            "auth.verification_token_ttl_hours",
            self.verification_token_ttl_hours,
            Duration::try_hours,
        )
    }

    pub fn leeway(&self) -> AppResult<Duration> {
        duration_setting(
            "auth.clock_skew_leeway_seconds",
            self.clock_skew_leeway_seconds,
            Duration::try_seconds,
        )
    }

    /// Lifetime of the longest-lived token kind.
    ///
    /// A subject watermark can be forgotten once this much time has passed,
    /// since every token issued before it has expired by then.
    pub fn longest_ttl(&self) -> AppResult<Duration> {
        Ok([
            self.access_ttl()?,
            self.refresh_ttl()?,
            self.reset_ttl()?,
            self.verification_ttl()?,
        ]
        .into_iter()
        .max()
        .unwrap_or_else(Duration::zero))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_issuer: default_issuer(),
            access_token_ttl_minutes: default_access_ttl(),
            refresh_token_ttl_hours: default_refresh_ttl(),
            reset_token_ttl_minutes: default_reset_ttl(),
            verification_token_ttl_hours: default_verification_ttl(),
            clock_skew_leeway_seconds: default_leeway(),
            revoke_family_on_reuse: true,
            password_reset_url: default_reset_url(),
            email_verification_url: default_verification_url(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("access_token_ttl_minutes", &self.access_token_ttl_minutes)
            .field("refresh_token_ttl_hours", &self.refresh_token_ttl_hours)
            .field("reset_token_ttl_minutes", &self.reset_token_ttl_minutes)
            .field(
                "verification_token_ttl_hours",
                &self.verification_token_ttl_hours,
            )
            .field("clock_skew_leeway_seconds", &self.clock_skew_leeway_seconds)
            .field("revoke_family_on_reuse", &self.revoke_family_on_reuse)
            .field("password_reset_url", &self.password_reset_url)
            .field("email_verification_url", &self.email_verification_url)
            .finish()
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_issuer() -> String {
    "warden".to_string()
}

fn default_access_ttl() -> u64 {
    15
}

fn default_refresh_ttl() -> u64 {
    168
}

fn default_reset_ttl() -> u64 {
    30
}

fn default_verification_ttl() -> u64 {
    48
}

fn default_leeway() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_reset_url() -> String {
    "http://localhost:3000/reset-password".to_string()
}

fn default_verification_url() -> String {
    "http://localhost:3000/verify-email".to_string()
}
