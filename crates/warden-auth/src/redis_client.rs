//! Redis connection management shared by the Redis-backed stores.

use std::future::Future;
use std::time::Duration;

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::{error, info};

use warden_core::config::{RedisConfig, StoreConfig};
use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;

/// Redis client wrapper with key prefixing and bounded operations.
#[derive(Clone)]
pub struct RedisClient {
    /// Redis connection manager (pooled, reconnecting).
    conn: ConnectionManager,
    /// Key prefix for all keys.
    key_prefix: String,
    /// Upper bound on one round trip.
    timeout: Duration,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("key_prefix", &self.key_prefix)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RedisClient {
    /// Connect using the store configuration.
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let redis: &RedisConfig = &config.redis;
        info!(url = %mask_redis_url(&redis.url), "Connecting to Redis");

        let client = Client::open(redis.url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Failed to create Redis client", e)
        })?;

        let connect_timeout = config.operation_timeout().saturating_mul(10);
        let conn = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| AppError::unavailable("Timed out connecting to Redis"))?
            .map_err(|e| AppError::with_source(ErrorKind::Unavailable, "Failed to connect to Redis", e))?;

        info!("Successfully connected to Redis");
        Ok(Self {
            conn,
            key_prefix: redis.key_prefix.clone(),
            timeout: config.operation_timeout(),
        })
    }

    /// Get a mutable clone of the connection manager.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Build a full key with the configured prefix.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }

    /// Run one Redis operation under the configured timeout.
    ///
    /// Timeouts and Redis errors both become `Unavailable` so that callers
    /// fail closed.
    pub async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(operation, error = %e, "Redis operation failed");
                Err(AppError::with_source(
                    ErrorKind::Unavailable,
                    format!("Redis {operation} failed"),
                    e,
                ))
            }
            Err(_) => {
                error!(operation, timeout_ms = self.timeout.as_millis() as u64, "Redis operation timed out");
                Err(AppError::unavailable(format!("Redis {operation} timed out")))
            }
        }
    }
}

/// Mask password in Redis URL for safe logging.
fn mask_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
