//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! an optional TOML file overlaid with `WARDEN__` environment variables.
//! Every field has a serde default, so an empty source yields a usable
//! (though not production-safe) configuration.

pub mod auth;
pub mod logging;
pub mod password;
pub mod rate_limit;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::auth::AuthConfig;
pub use self::logging::LoggingConfig;
pub use self::password::{HashConfig, PasswordConfig};
pub use self::rate_limit::{RateLimitConfig, RateLimitRule};
pub use self::store::{RedisConfig, StoreBackend, StoreConfig};

use crate::error::AppError;
use crate::result::AppResult;

/// Upper bound of any duration setting.
pub const MAX_DURATION_SETTING_DAYS: i64 = 3650;

/// Converts a numeric setting to a duration, rejecting values out of range.
pub(crate) fn duration_setting(
    name: &str,
    value: u64,
    unit: fn(i64) -> Option<chrono::Duration>,
) -> AppResult<chrono::Duration> {
    i64::try_from(value)
        .ok()
        .and_then(unit)
        .filter(|d| *d <= chrono::Duration::days(MAX_DURATION_SETTING_DAYS))
        .ok_or_else(|| {
            AppError::configuration(format!(
                "{name} = {value} exceeds {MAX_DURATION_SETTING_DAYS} days"
            ))
        })
}

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Token signing and lifetimes.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Password policy and hashing cost.
    #[serde(default)]
    pub password: PasswordConfig,
    /// Per-action attempt limits.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Revocation and rate-limit backing store.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// Environment variables use the `WARDEN__` prefix with `__` between
    /// path segments, e.g. `WARDEN__AUTH__JWT_SECRET`. The result is not
    /// validated; call [`AppConfig::validate`] before building services.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("WARDEN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Reject settings that would make the engine insecure or inert.
    pub fn validate(&self) -> Result<(), AppError> {
        let auth = &self.auth;
        if auth.jwt_secret.len() < auth::MIN_SECRET_BYTES {
            return Err(AppError::configuration(format!(
                "auth.jwt_secret must be at least {} bytes",
                auth::MIN_SECRET_BYTES
            )));
        }
        if auth.jwt_issuer.trim().is_empty() {
            return Err(AppError::configuration("auth.jwt_issuer must not be empty"));
        }
        for (name, value) in [
            ("auth.access_token_ttl_minutes", auth.access_token_ttl_minutes),
            ("auth.refresh_token_ttl_hours", auth.refresh_token_ttl_hours),
            ("auth.reset_token_ttl_minutes", auth.reset_token_ttl_minutes),
            (
                "auth.verification_token_ttl_hours",
                auth.verification_token_ttl_hours,
            ),
        ] {
            if value == 0 {
                return Err(AppError::configuration(format!("{name} must be positive")));
            }
        }
        auth.reset_ttl()?;
        auth.verification_ttl()?;
        auth.leeway()?;
        if auth.access_ttl()? >= auth.refresh_ttl()? {
            return Err(AppError::configuration(
                "auth.access_token_ttl_minutes must be shorter than the refresh token lifetime",
            ));
        }

        let password = &self.password;
        if password.min_length == 0 || password.min_length > password.max_length {
            return Err(AppError::configuration(
                "password.min_length must be positive and not exceed password.max_length",
            ));
        }
        if password.min_entropy_score > 4 {
            return Err(AppError::configuration(
                "password.min_entropy_score must be between 0 and 4",
            ));
        }
        let hash = &password.hash;
        if hash.memory_kib < 8 * hash.parallelism || hash.iterations == 0 || hash.parallelism == 0
        {
            return Err(AppError::configuration(
                "password.hash parameters are out of range",
            ));
        }

        for (name, rule) in [
            ("rate_limit.login", self.rate_limit.login),
            ("rate_limit.password_reset", self.rate_limit.password_reset),
            ("rate_limit.refresh", self.rate_limit.refresh),
            (
                "rate_limit.email_verification",
                self.rate_limit.email_verification,
            ),
        ] {
            if rule.max_attempts == 0 || rule.window_seconds == 0 {
                return Err(AppError::configuration(format!(
                    "{name} requires positive max_attempts and window_seconds"
                )));
            }
            rule.window()?;
        }

        if self.store.operation_timeout_ms == 0 {
            return Err(AppError::configuration(
                "store.operation_timeout_ms must be positive",
            ));
        }
        if self.store.sweep_interval_seconds == 0 {
            return Err(AppError::configuration(
                "store.sweep_interval_seconds must be positive",
            ));
        }
        if self.store.backend == StoreBackend::Redis && self.store.redis.url.trim().is_empty() {
            return Err(AppError::configuration(
                "store.redis.url is required for the redis backend",
            ));
        }

        match self.logging.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(AppError::configuration(format!(
                "logging.format must be \"json\" or \"pretty\", got \"{other}\""
            ))),
        }
    }
}
