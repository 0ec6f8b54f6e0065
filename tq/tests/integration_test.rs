//! Integration tests for timequeue
//!
//! These tests drive the public API the way a caller's wait/ready loop does.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use timequeue::{Clock, ExponentialBackoff, MockClock, Operation, Schedule, TimeHeap};

#[derive(Debug, Clone, PartialEq)]
struct Job {
    id: u32,
    delay: Duration,
}

impl Operation for Job {
    type Key = u32;

    fn key(&self) -> u32 {
        self.id
    }

    fn delay(&mut self) -> Duration {
        self.delay
    }
}

#[derive(Debug)]
struct RetryJob {
    id: u32,
    backoff: ExponentialBackoff,
}

impl Operation for RetryJob {
    type Key = u32;

    fn key(&self) -> u32 {
        self.id
    }

    fn delay(&mut self) -> Duration {
        self.backoff.delay()
    }
}

fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

// =============================================================================
// Schedule Tests
// =============================================================================

#[test]
fn test_schedule_scenario() {
    let clock = MockClock::new();
    let t = clock.now();
    let mut schedule: Schedule<Job> = Schedule::new(Arc::new(clock.clone()));

    for (id, delay) in [(0, 3000), (1, 1500), (2, 2000), (3, 2500)] {
        schedule.add(Job { id, delay: ms(delay) }).unwrap();
    }

    assert_eq!(schedule.next_deadline(), Some(t + ms(1500)));
    let mut next = schedule.next().unwrap();
    clock.advance(ms(1499));
    assert!((&mut next).now_or_never().is_none(), "Next signalled too soon");
    clock.advance(ms(1));
    assert!(next.now_or_never().is_some(), "Next not signalled at T+1.5s");

    let ids: Vec<u32> = schedule.ready(clock.now()).iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![1]);

    schedule.remove(&3);
    clock.advance_to(t + ms(4000));

    let ids: Vec<u32> = schedule.ready(clock.now()).iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![2, 0]);
    assert!(schedule.next().is_none());
}

#[test]
fn test_schedule_cancel_before_due() {
    let clock = MockClock::new();
    let mut schedule: Schedule<Job> = Schedule::new(Arc::new(clock.clone()));

    schedule.add(Job { id: 1, delay: ms(100) }).unwrap();
    let kept = schedule.add(Job { id: 2, delay: ms(200) }).unwrap();
    assert!(schedule.remove(&1).is_some());

    clock.advance_to(kept);
    let ready = schedule.ready(clock.now());
    assert_eq!(ready, vec![Job { id: 2, delay: ms(200) }]);
}

#[test]
fn test_cancel_races_firing() {
    let clock = MockClock::new();
    let mut schedule: Schedule<Job> = Schedule::new(Arc::new(clock.clone()));

    schedule.add(Job { id: 9, delay: ms(10) }).unwrap();
    clock.advance(ms(10));
    assert_eq!(schedule.ready(clock.now()).len(), 1);

    // Already handed out by ready; the late cancel is harmless
    assert!(schedule.remove(&9).is_none());
    assert!(schedule.is_empty());
}

#[test]
fn test_replace_pending_operation() {
    let clock = MockClock::new();
    let t = clock.now();
    let mut schedule: Schedule<Job> = Schedule::new(Arc::new(clock.clone()));

    schedule.add(Job { id: 5, delay: ms(5000) }).unwrap();
    assert!(schedule.add(Job { id: 5, delay: ms(10) }).is_err());

    let old = schedule.remove(&5).unwrap();
    assert_eq!(old.delay, ms(5000));
    let deadline = schedule.add(Job { id: 5, delay: ms(10) }).unwrap();

    assert_eq!(deadline, t + ms(10));
    assert_eq!(schedule.len(), 1);
}

#[tokio::test]
async fn test_retry_loop_with_backoff() {
    let clock = MockClock::new();
    let t = clock.now();
    let mut schedule: Schedule<RetryJob> = Schedule::new(Arc::new(clock.clone()));
    schedule
        .add(RetryJob {
            id: 1,
            backoff: ExponentialBackoff::with_bounds(ms(100), ms(1000)),
        })
        .unwrap();

    let mut fired_at = Vec::new();
    while let Some(next) = schedule.next() {
        if let Some(deadline) = schedule.next_deadline() {
            clock.advance_to(deadline);
        }
        next.await;

        for job in schedule.ready(clock.now()) {
            fired_at.push(clock.now() - t);
            if fired_at.len() < 6 {
                schedule.add(job).unwrap();
            }
        }
    }

    // Gaps: 100, 100, 200, 400, 800, 1000
    assert_eq!(fired_at, vec![ms(100), ms(200), ms(400), ms(800), ms(1600), ms(2600)]);
}

// =============================================================================
// TimeHeap Tests
// =============================================================================

#[test]
fn test_heap_no_loss_under_churn() {
    let clock = MockClock::new();
    let t = clock.now();
    let mut heap: TimeHeap<u32, u32> = TimeHeap::new(Arc::new(clock.clone()));

    // Deterministic spread of deadlines across 0..997ms
    for i in 0..500u32 {
        heap.add(i, i, t + ms(((i * 389) % 997) as u64)).unwrap();
    }
    for i in (0..500u32).filter(|i| i % 3 == 0) {
        assert_eq!(heap.remove(&i), Some(i));
    }

    let first = heap.ready(t + ms(500));
    assert!(first.windows(2).all(|w| heap_deadline_ms(w[0]) <= heap_deadline_ms(w[1])));
    assert!(first.iter().all(|&i| heap_deadline_ms(i) <= 500));

    let rest = heap.ready(t + ms(1000));
    assert!(rest.iter().all(|&i| heap_deadline_ms(i) > 500));
    assert!(heap.is_empty());

    let mut all: Vec<u32> = first.into_iter().chain(rest).collect();
    all.sort_unstable();
    let expected: Vec<u32> = (0..500).filter(|i| i % 3 != 0).collect();
    assert_eq!(all, expected);
}

fn heap_deadline_ms(i: u32) -> u32 {
    (i * 389) % 997
}

#[tokio::test]
async fn test_heap_next_with_system_clock() {
    let clock = timequeue::SystemClock;
    let mut heap: TimeHeap<&str, ()> = TimeHeap::new(Arc::new(clock));
    heap.add("soon", (), clock.now() + ms(20)).unwrap();

    let next = heap.next().unwrap();
    tokio::time::timeout(Duration::from_secs(5), next)
        .await
        .expect("Next should resolve");

    assert_eq!(heap.ready(clock.now()).len(), 1);
}
