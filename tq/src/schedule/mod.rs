//! Schedule of keyed operations
//!
//! Wraps a [`TimeHeap`](crate::TimeHeap) with a clock so callers work with
//! relative delays, plus the exponential backoff strategy used for retries.

mod backoff;
mod config;
mod core;
mod operation;

pub use self::core::Schedule;
pub use backoff::{ExponentialBackoff, MAX_RETRY_DELAY, MIN_RETRY_DELAY};
pub use config::BackoffConfig;
pub use operation::Operation;
