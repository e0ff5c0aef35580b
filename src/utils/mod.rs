//! Utility functions

pub mod time;
pub mod validation;

pub use time::{Clock, ManualClock, SystemClock};
