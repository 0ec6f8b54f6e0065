//! timequeue - keyed, time-ordered queue and schedule
//!
//! Answers three questions for a caller managing many pending, uniquely keyed
//! timed operations: what is due next, what is due now, and how to cancel the
//! pending operation with a given key. All three are O(log n).
//!
//! # Modules
//!
//! - [`clock`] - Clock capability with real and manually advanced clocks
//! - [`heap`] - [`TimeHeap`]: binary min-heap on deadline plus a key index
//! - [`schedule`] - [`Schedule`] of operations with relative delays, and
//!   [`ExponentialBackoff`] for retries
//! - [`config`], [`plan`], [`runner`], [`cli`] - the `tq` runner, a caller that
//!   drives a plan through a schedule
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use timequeue::{Clock, MockClock, TimeHeap};
//!
//! let clock = MockClock::new();
//! let mut heap = TimeHeap::new(Arc::new(clock.clone()));
//! let now = clock.now();
//!
//! heap.add("retry-7", "payload", now + Duration::from_secs(2)).unwrap();
//! heap.add("retry-8", "other", now + Duration::from_secs(1)).unwrap();
//! heap.remove(&"retry-7");
//!
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(heap.ready(clock.now()), vec!["other"]);
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod heap;
pub mod plan;
pub mod runner;
pub mod schedule;

pub use clock::{Clock, FAR_FUTURE, MockClock, Sleep, SystemClock, instant_after};
pub use config::Config;
pub use error::QueueError;
pub use heap::{PendingEntry, TimeHeap};
pub use plan::{Plan, PlannedOperation};
pub use runner::{Driver, Firing, PlanOperation, RunReport};
pub use schedule::{BackoffConfig, ExponentialBackoff, MAX_RETRY_DELAY, MIN_RETRY_DELAY, Operation, Schedule};
