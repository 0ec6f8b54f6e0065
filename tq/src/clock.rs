//! Clock capability consumed by the queue and schedule
//!
//! Nothing in this crate reads wall-clock time directly. [`SystemClock`] is
//! backed by tokio timers; [`MockClock`] only moves when told to, which keeps
//! scheduling tests exact.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// Wait handle returned by [`Clock::sleep`]
///
/// Completes no earlier than the requested duration has elapsed on the clock
/// that produced it.
pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Furthest a deadline is placed past the time it is computed from
///
/// Roughly 30 years. Delays beyond it are clamped so that turning a delay into
/// an `Instant` never overflows.
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, with `delay` clamped to [`FAR_FUTURE`]
pub fn instant_after(now: Instant, delay: Duration) -> Instant {
    let delay = delay.min(FAR_FUTURE);
    now.checked_add(delay).unwrap_or(now)
}

/// Source of the current time and of timed wake-ups
pub trait Clock: Send + Sync + 'static {
    /// Current time; must not go backwards between calls
    fn now(&self) -> Instant;

    /// Future that resolves once `duration` has elapsed
    fn sleep(&self, duration: Duration) -> Sleep;
}

impl fmt::Debug for dyn Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock").field("now", &self.now()).finish()
    }
}

/// Real time clock
///
/// `sleep` delegates to `tokio::time::sleep`, so it must be called from within
/// a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Manually advanced clock for deterministic tests and simulations
///
/// Time starts at the origin and only moves through [`MockClock::advance`].
/// Sleeps created from this clock resolve once the virtual elapsed time
/// reaches their deadline; advancing wakes every expired sleeper.
#[derive(Debug, Clone)]
pub struct MockClock {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug)]
struct MockState {
    origin: Instant,
    elapsed: Duration,
    sleepers: Vec<Arc<Sleeper>>,
    next_id: u64,
}

#[derive(Debug)]
struct Sleeper {
    id: u64,
    deadline: Duration,
    fired: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

impl Sleeper {
    fn fire(&self) {
        self.fired.store(true, Ordering::Release);
        let waker = lock(&self.waker).take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockClock {
    /// Create a clock whose origin is the real current instant
    pub fn new() -> Self {
        Self::with_start(Instant::now())
    }

    /// Create a clock starting at a fixed origin
    pub fn with_start(origin: Instant) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                origin,
                elapsed: Duration::ZERO,
                sleepers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Move time forward by `delta` and wake every sleeper now due
    ///
    /// Elapsed time stops at [`FAR_FUTURE`] past the origin.
    pub fn advance(&self, delta: Duration) {
        let due: Vec<Arc<Sleeper>> = {
            let mut state = lock(&self.inner);
            state.elapsed = state.elapsed.saturating_add(delta).min(FAR_FUTURE);
            let elapsed = state.elapsed;
            let (due, pending) = state.sleepers.drain(..).partition(|s| s.deadline <= elapsed);
            state.sleepers = pending;
            due
        };

        // Wake outside the state lock; a woken task may poll straight away
        for sleeper in due {
            sleeper.fire();
        }
    }

    /// Move time forward to `instant`; no-op if it is not in the future
    pub fn advance_to(&self, instant: Instant) {
        let now = self.now();
        if instant > now {
            self.advance(instant - now);
        }
    }

    /// Virtual time elapsed since the origin
    pub fn elapsed(&self) -> Duration {
        lock(&self.inner).elapsed
    }

    /// Number of sleeps still waiting on this clock
    pub fn pending_sleeps(&self) -> usize {
        lock(&self.inner).sleepers.len()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        let state = lock(&self.inner);
        instant_after(state.origin, state.elapsed)
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        let mut state = lock(&self.inner);
        let deadline = state.elapsed.saturating_add(duration).min(FAR_FUTURE);
        let id = state.next_id;
        state.next_id += 1;

        let sleeper = Arc::new(Sleeper {
            id,
            deadline,
            fired: AtomicBool::new(deadline <= state.elapsed),
            waker: Mutex::new(None),
        });
        if !sleeper.fired.load(Ordering::Acquire) {
            state.sleepers.push(Arc::clone(&sleeper));
        }

        Box::pin(MockSleep {
            clock: Arc::clone(&self.inner),
            sleeper,
        })
    }
}

struct MockSleep {
    clock: Arc<Mutex<MockState>>,
    sleeper: Arc<Sleeper>,
}

impl Future for MockSleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.sleeper.fired.load(Ordering::Acquire) {
            return Poll::Ready(());
        }

        *lock(&self.sleeper.waker) = Some(cx.waker().clone());

        // advance() may have fired between the check and storing the waker
        if self.sleeper.fired.load(Ordering::Acquire) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl Drop for MockSleep {
    fn drop(&mut self) {
        if !self.sleeper.fired.load(Ordering::Acquire) {
            let id = self.sleeper.id;
            lock(&self.clock).sleepers.retain(|s| s.id != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_mock_clock_starts_at_origin() {
        let origin = Instant::now();
        let clock = MockClock::with_start(origin);

        assert_eq!(clock.now(), origin);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_mock_clock_advance() {
        let origin = Instant::now();
        let clock = MockClock::with_start(origin);

        clock.advance(Duration::from_millis(1500));
        clock.advance(Duration::from_millis(500));

        assert_eq!(clock.now(), origin + Duration::from_secs(2));
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_mock_clock_advance_to() {
        let origin = Instant::now();
        let clock = MockClock::with_start(origin);

        clock.advance_to(origin + Duration::from_secs(3));
        assert_eq!(clock.elapsed(), Duration::from_secs(3));

        // Going backwards is ignored
        clock.advance_to(origin + Duration::from_secs(1));
        assert_eq!(clock.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn test_mock_sleep_resolves_at_deadline() {
        let clock = MockClock::new();
        let mut sleep = clock.sleep(Duration::from_secs(2));

        assert!((&mut sleep).now_or_never().is_none());

        clock.advance(Duration::from_millis(1999));
        assert!((&mut sleep).now_or_never().is_none());

        clock.advance(Duration::from_millis(1));
        assert!(sleep.now_or_never().is_some());
    }

    #[test]
    fn test_mock_sleep_zero_is_ready() {
        let clock = MockClock::new();
        assert!(clock.sleep(Duration::ZERO).now_or_never().is_some());
        assert_eq!(clock.pending_sleeps(), 0);
    }

    #[test]
    fn test_mock_sleep_dropped_unregisters() {
        let clock = MockClock::new();
        let sleep = clock.sleep(Duration::from_secs(5));
        assert_eq!(clock.pending_sleeps(), 1);

        drop(sleep);
        assert_eq!(clock.pending_sleeps(), 0);
    }

    #[tokio::test]
    async fn test_mock_sleep_wakes_waiting_task() {
        let clock = MockClock::new();
        let sleep = clock.sleep(Duration::from_secs(10));
        let handle = tokio::spawn(sleep);

        tokio::task::yield_now().await;
        clock.advance(Duration::from_secs(10));

        let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(result.is_ok(), "Sleep should complete after advance");
    }

    #[test]
    fn test_instant_after_clamps_to_far_future() {
        let now = Instant::now();

        assert_eq!(instant_after(now, Duration::from_secs(5)), now + Duration::from_secs(5));
        assert_eq!(instant_after(now, Duration::MAX), now + FAR_FUTURE);
    }

    #[test]
    fn test_mock_clock_advance_saturates() {
        let origin = Instant::now();
        let clock = MockClock::with_start(origin);

        clock.advance(Duration::MAX);
        clock.advance(Duration::MAX);

        assert_eq!(clock.elapsed(), FAR_FUTURE);
        assert_eq!(clock.now(), origin + FAR_FUTURE);

        // A sleep past the cap still resolves once the clock sits at it
        let sleep = clock.sleep(Duration::from_secs(1));
        assert!(sleep.now_or_never().is_some());
    }

    #[tokio::test]
    async fn test_system_clock_sleep() {
        let clock = SystemClock;
        let start = clock.now();

        clock.sleep(Duration::from_millis(20)).await;

        assert!(clock.now() - start >= Duration::from_millis(20));
    }
}
