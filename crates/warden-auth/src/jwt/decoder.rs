//! JWT token verification.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use warden_core::config::AuthConfig;
use warden_core::config::auth::MIN_SECRET_BYTES;
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::traits::Clock;

use super::claims::{TokenClaims, TokenType, WireClaims};

/// Verifies signature, issuer, and lifetime of Warden tokens.
///
/// Stateless: revocation is checked by the caller.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Signature and issuer validation. Expiry is checked against the clock.
    validation: Validation,
    /// Tolerated clock skew for `iat` in the future. At least one
    /// millisecond: tokens minted right after a bulk revocation are dated
    /// one millisecond past it.
    leeway: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .field("leeway", &self.leeway)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        if config.jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(AppError::configuration(format!(
                "JWT secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_issuer(&[config.jwt_issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);

        Ok(Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            leeway: config.leeway()?.max(Duration::milliseconds(1)),
            clock,
        })
    }

    /// Verifies a token and returns its claims.
    ///
    /// Fails with `MalformedToken` on a bad signature, structure, or issuer,
    /// or when the token claims to be issued further in the future than the
    /// leeway; with `ExpiredToken` once the clock reaches `expires_at`.
    pub fn decode(&self, token: &str) -> AppResult<TokenClaims> {
        let claims = self.verify_signature(token)?;
        let now = self.clock.now();

        if claims.issued_at > now + self.leeway {
            return Err(AppError::malformed_token("Token is issued in the future"));
        }
        if claims.is_expired_at(now) {
            return Err(AppError::expired_token(format!(
                "{} token has expired",
                claims.token_type
            )));
        }

        Ok(claims)
    }

    /// [`decode`](Self::decode) and require a specific token type.
    pub fn decode_as(&self, token: &str, expected: TokenType) -> AppResult<TokenClaims> {
        let claims = self.decode(token)?;
        if claims.token_type != expected {
            return Err(AppError::wrong_token_type(format!(
                "Invalid token type: expected {expected} token, got {}",
                claims.token_type
            )));
        }
        Ok(claims)
    }

    /// Verifies signature and structure only, ignoring the clock.
    ///
    /// For diagnostics; never use the result to grant access.
    pub fn inspect(&self, token: &str) -> AppResult<TokenClaims> {
        self.verify_signature(token)
    }

    fn verify_signature(&self, token: &str) -> AppResult<TokenClaims> {
        let token_data = decode::<WireClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::malformed_token("Invalid token signature")
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AppError::malformed_token("Token was issued by another issuer")
                }
                _ => AppError::malformed_token(format!("Token validation failed: {e}")),
            })?;

        token_data.claims.into_claims()
    }
}
