//! Shared value types.

pub mod id;
pub mod password_rule;

pub use id::{PrincipalId, TokenId};
pub use password_rule::PasswordRule;
