//! # warden-core
//!
//! Foundation crate for Warden. Holds the configuration schema, the
//! authentication error taxonomy, the injectable clock, and the typed
//! identifiers shared by every other crate.
//!
//! This crate has **no** internal dependencies on other Warden crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
pub use traits::{Clock, ManualClock, SystemClock};
