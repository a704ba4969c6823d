//! Claims carried by every Warden token.

use std::fmt;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

use warden_core::error::AppError;
use warden_core::types::{PrincipalId, TokenId};
use warden_entity::Role;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token presented on every request.
    Access,
    /// Long-lived, single-use token exchanged for a new pair.
    Refresh,
    /// Single-use token emailed for a password reset.
    PasswordReset,
    /// Single-use token emailed to confirm an address.
    EmailVerification,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::PasswordReset => "password_reset",
            Self::EmailVerification => "email_verification",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded, verified token contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenClaims {
    pub subject_id: PrincipalId,
    /// Role at issuance. Authorization uses the principal's current role.
    pub role: Role,
    pub token_id: TokenId,
    pub token_type: TokenType,
    /// Millisecond precision.
    pub issued_at: DateTime<Utc>,
    /// Whole-second precision.
    pub expires_at: DateTime<Utc>,
}

impl TokenClaims {
    /// Builds claims for a fresh token with a new id.
    ///
    /// `issued_at` is truncated to milliseconds and `expires_at` to whole
    /// seconds so that both survive the round trip through the wire format.
    pub fn new(
        subject_id: PrincipalId,
        role: Role,
        token_type: TokenType,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let issued_at = now
            .duration_trunc(Duration::milliseconds(1))
            .unwrap_or(now);
        let expires_at = (issued_at + ttl)
            .duration_trunc(Duration::seconds(1))
            .unwrap_or(issued_at + ttl);
        Self {
            subject_id,
            role,
            token_id: TokenId::new(),
            token_type,
            issued_at,
            expires_at,
        }
    }

    /// Whether the token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// JWT payload as signed on the wire.
///
/// `iat` and `exp` are the registered second-resolution claims; `iat_ms`
/// carries the issuance instant at millisecond resolution for watermark
/// comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireClaims {
    pub sub: PrincipalId,
    pub role: Role,
    pub jti: TokenId,
    pub typ: TokenType,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub iat_ms: i64,
}

impl WireClaims {
    pub fn from_claims(claims: &TokenClaims, issuer: &str) -> Self {
        Self {
            sub: claims.subject_id,
            role: claims.role,
            jti: claims.token_id,
            typ: claims.token_type,
            iss: issuer.to_string(),
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
            iat_ms: claims.issued_at.timestamp_millis(),
        }
    }

    pub fn into_claims(self) -> Result<TokenClaims, AppError> {
        let issued_at = DateTime::from_timestamp_millis(self.iat_ms)
            .ok_or_else(|| AppError::malformed_token("Issued-at is out of range"))?;
        let expires_at = DateTime::from_timestamp(self.exp, 0)
            .ok_or_else(|| AppError::malformed_token("Expiry is out of range"))?;

        if issued_at.timestamp() != self.iat {
            return Err(AppError::malformed_token("Inconsistent issued-at claims"));
        }
        if expires_at <= issued_at {
            return Err(AppError::malformed_token("Token expires before it was issued"));
        }

        Ok(TokenClaims {
            subject_id: self.sub,
            role: self.role,
            token_id: self.jti,
            token_type: self.typ,
            issued_at,
            expires_at,
        })
    }
}
