//! Password policy rules reported by weak-password errors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single password policy rule a candidate password can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordRule {
    /// Shorter than the configured minimum length.
    MinLength(usize),
    /// Longer than the configured maximum length.
    MaxLength(usize),
    /// No upper-case letter.
    Uppercase,
    /// No lower-case letter.
    Lowercase,
    /// No decimal digit.
    Digit,
    /// No symbol (non-alphanumeric character).
    Symbol,
    /// Estimated entropy score below the configured minimum (0-4).
    Entropy(u8),
    /// Identical to the current password.
    SameAsCurrent,
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinLength(n) => write!(f, "must be at least {n} characters long"),
            Self::MaxLength(n) => write!(f, "must be at most {n} characters long"),
            Self::Uppercase => write!(f, "must contain an upper-case letter"),
            Self::Lowercase => write!(f, "must contain a lower-case letter"),
            Self::Digit => write!(f, "must contain a digit"),
            Self::Symbol => write!(f, "must contain a symbol"),
            Self::Entropy(score) => write!(f, "must reach a strength score of {score}"),
            Self::SameAsCurrent => write!(f, "must differ from the current password"),
        }
    }
}
