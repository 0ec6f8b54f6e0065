//! Schedule implementation

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::clock::{self, Clock, Sleep};
use crate::error::QueueError;
use crate::heap::{PendingEntry, TimeHeap};

use super::operation::Operation;

/// Schedule of keyed operations ordered by the time they become ready
///
/// An operation's delay is turned into an absolute deadline once, when it is
/// added, using the schedule's clock. Re-adding an operation reads its delay
/// again, so a changing delay (such as backoff) takes effect per add.
#[derive(Debug)]
pub struct Schedule<O: Operation> {
    clock: Arc<dyn Clock>,
    heap: TimeHeap<O::Key, O>,
}

impl<O: Operation> Schedule<O> {
    /// Create an empty schedule reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        debug!("Schedule::new: called");
        Self {
            heap: TimeHeap::new(Arc::clone(&clock)),
            clock,
        }
    }

    /// Current time on the schedule's clock
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, key: &O::Key) -> bool {
        self.heap.contains_key(key)
    }

    /// Time at which the next operation becomes ready
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.next_deadline()
    }

    /// Wait handle resolving when the next operation is due; `None` if nothing is scheduled
    pub fn next(&self) -> Option<Sleep> {
        self.heap.next()
    }

    /// Remove and return the operations due at or before `now`, earliest first
    pub fn ready(&mut self, now: Instant) -> Vec<O> {
        self.heap.ready(now)
    }

    /// Schedule `op` at the current time plus its delay
    ///
    /// Delays longer than [`FAR_FUTURE`](crate::clock::FAR_FUTURE) are clamped
    /// to it. Returns the deadline it was scheduled for. Fails with
    /// [`QueueError::DuplicateKey`] if an operation with the same key is
    /// already scheduled.
    pub fn add(&mut self, mut op: O) -> Result<Instant, QueueError> {
        let key = op.key();
        if self.heap.contains_key(&key) {
            // Checked up front so a rejected add leaves the delay state alone
            return Err(QueueError::duplicate_key(&key));
        }

        let delay = op.delay();
        let deadline = clock::instant_after(self.clock.now(), delay);
        debug!(?key, ?delay, "Schedule::add: called");
        self.heap.add(key, op, deadline)?;
        Ok(deadline)
    }

    /// Unschedule the operation with `key`; no-op if it is not scheduled
    pub fn remove(&mut self, key: &O::Key) -> Option<O> {
        debug!(?key, "Schedule::remove: called");
        self.heap.remove(key)
    }

    /// Scheduled operations in the order they would become ready
    pub fn pending(&self) -> Vec<PendingEntry<'_, O::Key, O>> {
        self.heap.pending()
    }
}
