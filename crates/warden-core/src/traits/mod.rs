//! Core traits defined in `warden-core` and implemented elsewhere.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};
