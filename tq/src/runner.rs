//! Wait/ready loop driving a plan through a [`Schedule`]
//!
//! This is a caller of the schedule, not part of it: it owns the clock,
//! waits on the schedule's next deadline, fires whatever is ready and re-adds
//! operations that still have attempts left.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, MockClock, SystemClock};
use crate::plan::{Plan, PlannedOperation};
use crate::schedule::{BackoffConfig, ExponentialBackoff, Operation, Schedule};

/// Schedule entry built from a [`PlannedOperation`]
///
/// The first firing uses the planned delay; every later one asks the embedded
/// backoff.
#[derive(Debug, Clone)]
pub struct PlanOperation {
    key: String,
    first_delay: Duration,
    attempt: u32,
    attempts: u32,
    backoff: ExponentialBackoff,
}

impl PlanOperation {
    pub fn new(planned: &PlannedOperation, backoff: &BackoffConfig) -> Self {
        Self {
            key: planned.key.clone(),
            first_delay: planned.delay(),
            attempt: 0,
            attempts: planned.attempts,
            backoff: ExponentialBackoff::from_config(backoff),
        }
    }

    /// Number of times this operation has fired
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn has_attempts_left(&self) -> bool {
        self.attempt < self.attempts
    }
}

impl Operation for PlanOperation {
    type Key = String;

    fn key(&self) -> String {
        self.key.clone()
    }

    fn delay(&mut self) -> Duration {
        if self.attempt == 0 {
            self.first_delay
        } else {
            self.backoff.delay()
        }
    }
}

/// How the runner waits for deadlines
#[derive(Debug, Clone)]
pub enum Driver {
    /// Real time; waits actually sleep
    System,
    /// Virtual time; the clock jumps to each deadline
    Simulated(MockClock),
}

impl Driver {
    fn clock(&self) -> Arc<dyn Clock> {
        match self {
            Driver::System => Arc::new(SystemClock),
            Driver::Simulated(clock) => Arc::new(clock.clone()),
        }
    }
}

/// One firing of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Firing {
    pub key: String,
    /// 1-based attempt number
    pub attempt: u32,
    /// Time since the run started, in milliseconds
    pub elapsed_ms: u64,
    /// Whether the operation was put back on the schedule
    pub rescheduled: bool,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub fired: Vec<Firing>,
    /// Cancel keys that removed a pending operation
    pub cancelled: Vec<String>,
    /// Cancel keys that matched nothing
    pub not_found: Vec<String>,
}

/// First deadline of every operation in a plan, relative to the start
pub fn first_deadlines(plan: &Plan, backoff: &BackoffConfig) -> Result<Vec<(String, Duration)>> {
    let clock = MockClock::new();
    let start = clock.now();
    let mut schedule = Schedule::new(Arc::new(clock));
    for planned in &plan.operations {
        schedule.add(PlanOperation::new(planned, backoff))?;
    }
    Ok(schedule
        .pending()
        .into_iter()
        .map(|entry| (entry.key.clone(), entry.deadline - start))
        .collect())
}

/// Run `plan` until nothing is left on the schedule
///
/// `on_fire` sees every firing as it happens; the same firings are collected
/// in the returned report.
pub async fn run<F>(plan: &Plan, backoff: &BackoffConfig, driver: Driver, mut on_fire: F) -> Result<RunReport>
where
    F: FnMut(&Firing),
{
    let clock = driver.clock();
    let start = clock.now();
    let mut schedule: Schedule<PlanOperation> = Schedule::new(Arc::clone(&clock));
    let mut report = RunReport::default();

    for planned in &plan.operations {
        let deadline = schedule
            .add(PlanOperation::new(planned, backoff))
            .context(format!("Failed to schedule {}", planned.key))?;
        debug!(key = %planned.key, after = ?(deadline - start), "run: scheduled");
    }

    for key in &plan.cancel {
        match schedule.remove(key) {
            Some(_) => {
                info!(%key, "Cancelled pending operation");
                report.cancelled.push(key.clone());
            }
            None => {
                warn!(%key, "Cancel requested for unknown operation");
                report.not_found.push(key.clone());
            }
        }
    }

    while let Some(next) = schedule.next() {
        if let (Driver::Simulated(mock), Some(deadline)) = (&driver, schedule.next_deadline()) {
            mock.advance_to(deadline);
        }
        next.await;

        let now = clock.now();
        for mut op in schedule.ready(now) {
            op.attempt += 1;
            let firing = Firing {
                key: op.key.clone(),
                attempt: op.attempt,
                elapsed_ms: elapsed_ms(start, now),
                rescheduled: op.has_attempts_left(),
            };
            info!(key = %firing.key, attempt = firing.attempt, elapsed_ms = firing.elapsed_ms, "Operation fired");
            on_fire(&firing);
            report.fired.push(firing);

            if op.has_attempts_left() {
                let key = op.key.clone();
                let deadline = schedule.add(op).context(format!("Failed to reschedule {}", key))?;
                debug!(%key, after = ?(deadline - now), "run: rescheduled with backoff");
            }
        }
    }

    info!(fired = report.fired.len(), "Schedule drained");
    Ok(report)
}

fn elapsed_ms(start: Instant, now: Instant) -> u64 {
    now.saturating_duration_since(start).as_millis() as u64
}
