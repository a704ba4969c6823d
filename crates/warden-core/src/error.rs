//! Unified error types for Warden.
//!
//! Every fallible operation in the workspace returns [`AppError`]. The
//! [`ErrorKind`] is the discriminant callers match on; the message is
//! diagnostic text for logs and must never contain secrets.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::PasswordRule;

/// Error categories produced by the authentication core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Unknown email or wrong password.
    InvalidCredentials,
    /// The principal has been blocked by an operator.
    AccountBlocked,
    /// The principal has been deactivated.
    AccountInactive,
    /// The token's expiry instant has passed.
    ExpiredToken,
    /// Signature, structure, or issuer check failed.
    MalformedToken,
    /// A token of another type was presented (e.g. access instead of refresh).
    WrongTokenType,
    /// The token id, or every token of its subject, has been revoked.
    TokenRevoked,
    /// A new password does not satisfy the policy.
    WeakPassword,
    /// Too many login attempts for this email and address.
    LoginRateLimited,
    /// Too many password reset requests for this email.
    ResetRateLimited,
    /// Too many refresh calls for this subject.
    RefreshRateLimited,
    /// Too many verification email requests for this email.
    VerificationRateLimited,
    /// Authenticated, but the role lacks the requested capability.
    Forbidden,
    /// No valid identity was presented.
    Unauthenticated,
    /// A backing store failed or timed out. The only retryable kind.
    Unavailable,
    /// Input validation failed.
    Validation,
    /// The operation conflicts with existing state (duplicate email, ...).
    Conflict,
    /// The referenced principal does not exist.
    NotFound,
    /// Configuration is missing or invalid.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An unexpected internal failure.
    Internal,
}

impl ErrorKind {
    /// Kinds that reveal account state and are collapsed at the boundary.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::AccountBlocked | Self::AccountInactive
        )
    }

    /// Whether this kind is one of the rate-limit denials.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::LoginRateLimited
                | Self::ResetRateLimited
                | Self::RefreshRateLimited
                | Self::VerificationRateLimited
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountBlocked => "ACCOUNT_BLOCKED",
            Self::AccountInactive => "ACCOUNT_INACTIVE",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::MalformedToken => "MALFORMED_TOKEN",
            Self::WrongTokenType => "WRONG_TOKEN_TYPE",
            Self::TokenRevoked => "TOKEN_REVOKED",
            Self::WeakPassword => "WEAK_PASSWORD",
            Self::LoginRateLimited => "LOGIN_RATE_LIMITED",
            Self::ResetRateLimited => "RESET_RATE_LIMITED",
            Self::RefreshRateLimited => "REFRESH_RATE_LIMITED",
            Self::VerificationRateLimited => "VERIFICATION_RATE_LIMITED",
            Self::Forbidden => "FORBIDDEN",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Unavailable => "UNAVAILABLE",
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
            Self::Internal => "INTERNAL",
        };
        f.write_str(code)
    }
}

/// Structured payload attached to some error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetail {
    /// Earliest instant at which a rate-limited action will be admitted again.
    RetryAfter(DateTime<Utc>),
    /// Every password rule the candidate failed.
    PasswordRules(Vec<PasswordRule>),
}

/// The unified error returned by every Warden operation.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// Diagnostic message. Never contains passwords or token strings.
    pub message: String,
    /// Optional structured payload.
    pub detail: Option<ErrorDetail>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            source: Some(Box::new(source)),
        }
    }

    /// Attach a structured detail.
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorKind::InvalidCredentials, "Invalid email or password")
    }

    pub fn account_blocked() -> Self {
        Self::new(ErrorKind::AccountBlocked, "Account is blocked")
    }

    pub fn account_inactive() -> Self {
        Self::new(ErrorKind::AccountInactive, "Account is inactive")
    }

    pub fn expired_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExpiredToken, message)
    }

    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedToken, message)
    }

    pub fn wrong_token_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WrongTokenType, message)
    }

    pub fn token_revoked(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenRevoked, message)
    }

    /// Create a weak-password error listing every failed rule.
    pub fn weak_password(rules: Vec<PasswordRule>) -> Self {
        let summary = rules
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::new(
            ErrorKind::WeakPassword,
            format!("Password does not meet policy: {summary}"),
        )
        .with_detail(ErrorDetail::PasswordRules(rules))
    }

    /// Create a rate-limit error of the given kind with its retry-after hint.
    pub fn rate_limited(kind: ErrorKind, retry_after: DateTime<Utc>) -> Self {
        debug_assert!(kind.is_rate_limited());
        Self::new(
            kind,
            format!("Too many attempts, retry after {}", retry_after.to_rfc3339()),
        )
        .with_detail(ErrorDetail::RetryAfter(retry_after))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Only backing-store failures are worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Unavailable
    }

    /// The retry-after hint of a rate-limit error.
    pub fn retry_after(&self) -> Option<DateTime<Utc>> {
        match &self.detail {
            Some(ErrorDetail::RetryAfter(at)) => Some(*at),
            _ => None,
        }
    }

    /// The failed rules of a weak-password error.
    pub fn password_rules(&self) -> &[PasswordRule] {
        match &self.detail {
            Some(ErrorDetail::PasswordRules(rules)) => rules,
            _ => &[],
        }
    }

    /// Message safe to show to an unauthenticated caller.
    ///
    /// Credential failures collapse into one message so that responses do
    /// not reveal whether an account exists or what state it is in.
    pub fn public_message(&self) -> String {
        match self.kind {
            k if k.is_credential_failure() => "Invalid email or password".to_string(),
            ErrorKind::Unavailable => "Service temporarily unavailable".to_string(),
            ErrorKind::Internal | ErrorKind::Configuration | ErrorKind::Serialization => {
                "Internal error".to_string()
            }
            _ => self.message.clone(),
        }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            detail: self.detail.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
