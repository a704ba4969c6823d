//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use warden_auth::jwt::JwtDecoder;
use warden_auth::password::PasswordHasher;
use warden_auth::{
    AuthServices, AuthenticatedIdentity, LoginResult, MemoryRateLimiter, RevocationStore,
};
use warden_core::config::{AppConfig, HashConfig};
use warden_core::traits::{Clock, ManualClock};
use warden_core::types::PrincipalId;
use warden_directory::{InMemoryUserRepository, Notifier, UserRepository};
use warden_entity::{NewPrincipal, Principal, Role, Status};

/// Password every helper-created principal starts with.
pub const PASSWORD: &str = "Correct#Horse1";

/// A second policy-compliant password.
pub const NEW_PASSWORD: &str = "Battery#Staple2";

/// Kind of email captured by [`RecordingNotifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    PasswordReset,
}

/// An email that would have been delivered.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub kind: EmailKind,
    pub principal_id: PrincipalId,
    pub link: String,
}

impl SentEmail {
    /// The bearer token carried by the link.
    pub fn token(&self) -> &str {
        self.link
            .split_once("token=")
            .map(|(_, token)| token)
            .unwrap_or_default()
    }
}

/// Notifier that keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, kind: EmailKind) -> usize {
        self.sent().iter().filter(|e| e.kind == kind).count()
    }

    pub fn last(&self, kind: EmailKind) -> Option<SentEmail> {
        self.sent().into_iter().rev().find(|e| e.kind == kind)
    }

    fn record(&self, kind: EmailKind, principal: &Principal, link: &str) {
        self.sent.lock().unwrap().push(SentEmail {
            kind,
            principal_id: principal.id,
            link: link.to_string(),
        });
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_verification_email(&self, principal: &Principal, link: &str) {
        self.record(EmailKind::Verification, principal, link);
    }

    async fn send_password_reset_email(&self, principal: &Principal, link: &str) {
        self.record(EmailKind::PasswordReset, principal, link);
    }
}

/// Configuration with a valid secret and cheap Argon2 parameters.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "integration-test-secret-0123456789abcdef".to_string();
    config.password.hash = HashConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    };
    config
}

/// Address used for login attempts.
pub fn client_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7))
}

/// Test application context
pub struct TestContext {
    pub services: AuthServices,
    pub users: InMemoryUserRepository,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: ManualClock,
    pub config: AppConfig,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let clock = ManualClock::starting_now();
        let users = InMemoryUserRepository::new();
        let notifier = Arc::new(RecordingNotifier::default());

        let services = AuthServices::build(
            &config,
            Arc::new(users.clone()),
            notifier.clone(),
            Arc::new(clock.clone()),
        )
        .await
        .expect("Failed to build auth services");

        Self {
            services,
            users,
            notifier,
            clock,
            config,
        }
    }

    /// Context whose engine records revocations in `revocations`.
    pub fn with_revocations(
        config: AppConfig,
        clock: ManualClock,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        let users = InMemoryUserRepository::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let services = AuthServices::with_stores(
            &config,
            Arc::new(users.clone()),
            notifier.clone(),
            Arc::clone(&shared_clock),
            revocations,
            Arc::new(MemoryRateLimiter::new(shared_clock)),
        )
        .expect("Failed to build auth services");

        Self {
            services,
            users,
            notifier,
            clock,
            config,
        }
    }

    /// Inserts a principal with [`PASSWORD`] straight into the directory.
    pub async fn create_principal(&self, email: &str, role: Role, status: Status) -> Principal {
        let hasher = PasswordHasher::new(&self.config.password.hash).unwrap();
        let password_hash = hasher.hash(PASSWORD).await.unwrap();
        self.users
            .create(NewPrincipal {
                email: email.to_string(),
                username: email.split('@').next().unwrap_or(email).to_string(),
                password_hash,
                role,
                status,
                email_verified: true,
                created_at: self.clock.now(),
            })
            .await
            .expect("Failed to create principal")
    }

    pub async fn create_user(&self, email: &str) -> Principal {
        self.create_principal(email, Role::User, Status::Active).await
    }

    pub async fn login(&self, email: &str) -> LoginResult {
        self.services
            .sessions
            .login(email, PASSWORD, client_ip())
            .await
            .expect("Login failed")
    }

    /// Logs in and authenticates the resulting access token.
    pub async fn identity(&self, email: &str) -> (LoginResult, AuthenticatedIdentity) {
        let login = self.login(email).await;
        let identity = self
            .services
            .sessions
            .authenticate(&login.tokens.access_token)
            .await
            .expect("Authentication failed");
        (login, identity)
    }

    pub fn decoder(&self) -> JwtDecoder {
        let clock: Arc<dyn Clock> = Arc::new(self.clock.clone());
        JwtDecoder::new(&self.config.auth, clock).unwrap()
    }

    pub async fn principal(&self, id: PrincipalId) -> Principal {
        self.users.find_by_id(id).await.unwrap().expect("Principal missing")
    }
}
