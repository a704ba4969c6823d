//! Password policy enforcement for new passwords.

use warden_core::config::PasswordConfig;
use warden_core::error::AppError;
use warden_core::types::PasswordRule;

/// Validates password strength against configured policies.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    config: PasswordConfig,
}

impl PasswordValidator {
    /// Creates a new validator from password configuration.
    pub fn new(config: &PasswordConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Returns every rule the password fails. Empty means acceptable.
    ///
    /// `user_inputs` (email, username) are fed to the entropy estimator so
    /// that passwords derived from them score lower.
    pub fn check(&self, password: &str, user_inputs: &[&str]) -> Vec<PasswordRule> {
        let config = &self.config;
        let mut failed = Vec::new();

        let length = password.chars().count();
        if length < config.min_length {
            failed.push(PasswordRule::MinLength(config.min_length));
        }
        if length > config.max_length {
            failed.push(PasswordRule::MaxLength(config.max_length));
        }
        if config.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            failed.push(PasswordRule::Uppercase);
        }
        if config.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            failed.push(PasswordRule::Lowercase);
        }
        if config.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            failed.push(PasswordRule::Digit);
        }
        if config.require_symbol && !password.chars().any(|c| !c.is_alphanumeric()) {
            failed.push(PasswordRule::Symbol);
        }

        if config.min_entropy_score > 0 && !password.is_empty() {
            let estimate = zxcvbn::zxcvbn(password, user_inputs);
            if (estimate.score() as u8) < config.min_entropy_score {
                failed.push(PasswordRule::Entropy(config.min_entropy_score));
            }
        }

        failed
    }

    /// Validates a password against all configured policies.
    ///
    /// The error lists every failed rule, not just the first.
    pub fn validate(&self, password: &str, user_inputs: &[&str]) -> Result<(), AppError> {
        let failed = self.check(password, user_inputs);
        if failed.is_empty() {
            Ok(())
        } else {
            Err(AppError::weak_password(failed))
        }
    }
}
