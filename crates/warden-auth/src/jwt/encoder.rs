//! JWT token creation with configurable signing and TTL.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use warden_core::config::AuthConfig;
use warden_core::config::auth::MIN_SECRET_BYTES;
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::types::PrincipalId;
use warden_entity::Role;

use super::claims::{TokenClaims, TokenType, WireClaims};

/// Creates signed HS256 tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
    verification_ttl: Duration,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Result of a successful token pair generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Access token expiration timestamp.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiration timestamp.
    pub refresh_expires_at: DateTime<Utc>,
    /// Access token lifetime in seconds.
    pub access_expires_in: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: i64,
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        if config.jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(AppError::configuration(format!(
                "JWT secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            access_ttl: config.access_ttl()?,
            refresh_ttl: config.refresh_ttl()?,
            reset_ttl: config.reset_ttl()?,
            verification_ttl: config.verification_ttl()?,
        })
    }

    /// Configured lifetime of the given token type.
    pub fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
            TokenType::PasswordReset => self.reset_ttl,
            TokenType::EmailVerification => self.verification_ttl,
        }
    }

    /// Signs the given claims.
    pub fn issue(&self, claims: &TokenClaims) -> AppResult<String> {
        let wire = WireClaims::from_claims(claims, &self.issuer);
        encode(&Header::new(Algorithm::HS256), &wire, &self.encoding_key).map_err(|e| {
            AppError::internal(format!("Failed to encode {} token: {e}", claims.token_type))
        })
    }

    /// Builds and signs a single token of the given type issued at `now`.
    pub fn issue_new(
        &self,
        subject_id: PrincipalId,
        role: Role,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> AppResult<(String, TokenClaims)> {
        let claims = TokenClaims::new(subject_id, role, token_type, now, self.ttl(token_type));
        let token = self.issue(&claims)?;
        Ok((token, claims))
    }

    /// Generates a new access + refresh token pair, each with a fresh id.
    pub fn issue_pair(
        &self,
        subject_id: PrincipalId,
        role: Role,
        now: DateTime<Utc>,
    ) -> AppResult<TokenPair> {
        let (access_token, access) = self.issue_new(subject_id, role, TokenType::Access, now)?;
        let (refresh_token, refresh) = self.issue_new(subject_id, role, TokenType::Refresh, now)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
            access_expires_in: self.access_ttl.num_seconds(),
            refresh_expires_in: self.refresh_ttl.num_seconds(),
        })
    }
}
