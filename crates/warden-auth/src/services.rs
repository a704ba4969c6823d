//! Wires every auth component from configuration.

use std::sync::Arc;

use tracing::info;

use warden_core::config::{AppConfig, StoreBackend};
use warden_core::result::AppResult;
use warden_core::traits::Clock;
use warden_directory::{Notifier, UserRepository};

use crate::account::AccountManager;
use crate::jwt::{JwtDecoder, JwtEncoder};
use crate::password::{PasswordHasher, PasswordValidator};
use crate::ratelimit::{MemoryRateLimiter, RateLimiter};
use crate::rbac::AccessControl;
use crate::revocation::{MemoryRevocationStore, RevocationStore, RevocationSweeper};
use crate::session::SessionManager;

/// The assembled auth engine.
#[derive(Debug, Clone)]
pub struct AuthServices {
    pub sessions: Arc<SessionManager>,
    pub accounts: Arc<AccountManager>,
    pub access: AccessControl,
    pub revocations: Arc<dyn RevocationStore>,
    pub limiter: Arc<dyn RateLimiter>,
    sweep_interval: std::time::Duration,
}

impl AuthServices {
    /// Builds the engine, connecting to Redis when the store backend asks for it.
    pub async fn build(
        config: &AppConfig,
        user_repo: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        config.validate()?;

        let (revocations, limiter): (Arc<dyn RevocationStore>, Arc<dyn RateLimiter>) =
            match config.store.backend {
                StoreBackend::Memory => (
                    Arc::new(MemoryRevocationStore::new(
                        Arc::clone(&clock),
                        config.auth.longest_ttl()?,
                    )),
                    Arc::new(MemoryRateLimiter::new(Arc::clone(&clock))),
                ),
                #[cfg(feature = "redis-store")]
                StoreBackend::Redis => {
                    let client = crate::redis_client::RedisClient::connect(&config.store).await?;
                    (
                        Arc::new(crate::revocation::RedisRevocationStore::new(
                            client.clone(),
                            Arc::clone(&clock),
                            config.auth.longest_ttl()?,
                        )),
                        Arc::new(crate::ratelimit::RedisRateLimiter::new(
                            client,
                            Arc::clone(&clock),
                        )),
                    )
                }
                #[cfg(not(feature = "redis-store"))]
                StoreBackend::Redis => {
                    return Err(warden_core::error::AppError::configuration(
                        "Redis store backend requested but the redis-store feature is disabled",
                    ));
                }
            };

        info!(backend = %config.store.backend, "Auth stores initialized");

        Self::with_stores(config, user_repo, notifier, clock, revocations, limiter)
    }

    /// Builds the engine around caller-supplied stores.
    pub fn with_stores(
        config: &AppConfig,
        user_repo: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        revocations: Arc<dyn RevocationStore>,
        limiter: Arc<dyn RateLimiter>,
    ) -> AppResult<Self> {
        let jwt_encoder = Arc::new(JwtEncoder::new(&config.auth)?);
        let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth, Arc::clone(&clock))?);
        let password_hasher = Arc::new(PasswordHasher::new(&config.password.hash)?);
        let password_validator = Arc::new(PasswordValidator::new(&config.password));

        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&jwt_encoder),
            Arc::clone(&jwt_decoder),
            Arc::clone(&revocations),
            Arc::clone(&limiter),
            Arc::clone(&user_repo),
            Arc::clone(&password_hasher),
            Arc::clone(&password_validator),
            Arc::clone(&clock),
            config.auth.clone(),
            config.rate_limit.clone(),
        ));

        let accounts = Arc::new(AccountManager::new(
            jwt_encoder,
            jwt_decoder,
            Arc::clone(&revocations),
            Arc::clone(&limiter),
            user_repo,
            notifier,
            password_hasher,
            password_validator,
            clock,
            config.auth.clone(),
            config.rate_limit.clone(),
        ));

        Ok(Self {
            sessions,
            accounts,
            access: AccessControl::new(),
            revocations,
            limiter,
            sweep_interval: config.store.sweep_interval(),
        })
    }

    /// A sweeper over this engine's stores at the configured interval.
    pub fn sweeper(&self) -> RevocationSweeper {
        RevocationSweeper::new(
            Arc::clone(&self.revocations),
            Arc::clone(&self.limiter),
            self.sweep_interval,
        )
    }
}
