//! # warden-auth
//!
//! Credential and token lifecycle for Warden: login, refresh rotation,
//! logout, two-tier revocation, attempt rate limiting, and role-based
//! access control.
//!
//! ## Modules
//!
//! - `password` — Argon2id password hashing and strength policy
//! - `jwt` — signed token issuance and validation
//! - `revocation` — revoked token ids, subject watermarks, periodic sweep
//! - `ratelimit` — fixed-window attempt counters
//! - `rbac` — static role to capability table
//! - `session` — login, refresh, logout, per-request authentication
//! - `account` — registration, password reset, email verification, admin changes
//! - `services` — assembly of all of the above from configuration

pub mod account;
pub mod jwt;
pub mod password;
pub mod ratelimit;
pub mod rbac;
#[cfg(feature = "redis-store")]
pub mod redis_client;
pub mod revocation;
pub mod services;
pub mod session;

pub use account::{AccountManager, RegistrationRequest};
pub use jwt::{JwtDecoder, JwtEncoder, TokenClaims, TokenPair, TokenType};
pub use password::{PasswordHasher, PasswordValidator};
pub use ratelimit::{Admission, MemoryRateLimiter, RateLimitAction, RateLimitKey, RateLimiter};
pub use rbac::{AccessControl, Capability, capabilities_of};
pub use revocation::{MemoryRevocationStore, RevocationStore, RevocationSweeper, SweepReport};
pub use services::AuthServices;
pub use session::{AuthenticatedIdentity, LoginResult, SessionManager};
