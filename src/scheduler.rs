//! Timer scheduling for the reading session's loops.
//!
//! Sessions never sleep. They ask a [`Scheduler`] for a timer, get back a
//! [`TimerToken`], and are handed the token again once the deadline passes.
//! Cancelling a token guarantees it will never be delivered.
//!
//! Two implementations are provided: [`ManualScheduler`] runs on a virtual
//! clock that only moves when told to, and [`ClockScheduler`] reads a
//! monotonic wall clock.

use std::time::{Duration, Instant};

/// Handle for one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

/// Which loop a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Auto-advance while playing.
    Advance,
    /// Repeating movement while a hold gesture is active.
    Continuous,
    /// Coalesced search input.
    SearchDebounce,
}

/// A timer whose deadline has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub token: TimerToken,
    pub kind: TimerKind,
    pub deadline_ms: u64,
}

pub trait Scheduler {
    /// Milliseconds since the scheduler's epoch.
    fn now_ms(&self) -> u64;

    /// Schedule a timer `delay_ms` from now.
    fn schedule(&mut self, delay_ms: u64, kind: TimerKind) -> TimerToken;

    /// Cancel a pending timer. Returns `false` if it already fired or was
    /// never scheduled.
    fn cancel(&mut self, token: TimerToken) -> bool;

    /// Remove and return every timer that is due, earliest first.
    fn take_due(&mut self) -> Vec<Fired>;

    /// Deadline of the earliest pending timer.
    fn next_deadline(&self) -> Option<u64>;

    fn is_pending(&self, token: TimerToken) -> bool;

    /// Number of pending timers of `kind`.
    fn pending(&self, kind: TimerKind) -> usize;
}

/// Deadline-ordered pending timers, shared by the scheduler implementations.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    /// Sorted by `(deadline_ms, token)`.
    timers: Vec<Fired>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, deadline_ms: u64, kind: TimerKind) -> TimerToken {
        self.next_id += 1;
        let token = TimerToken(self.next_id);
        let at = self
            .timers
            .partition_point(|t| (t.deadline_ms, t.token) <= (deadline_ms, token));
        self.timers.insert(
            at,
            Fired {
                token,
                kind,
                deadline_ms,
            },
        );
        token
    }

    pub fn remove(&mut self, token: TimerToken) -> bool {
        match self.timers.iter().position(|t| t.token == token) {
            Some(index) => {
                self.timers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn pop_due(&mut self, now_ms: u64) -> Vec<Fired> {
        let due = self.timers.partition_point(|t| t.deadline_ms <= now_ms);
        self.timers.drain(..due).collect()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.first().map(|t| t.deadline_ms)
    }

    pub fn contains(&self, token: TimerToken) -> bool {
        self.timers.iter().any(|t| t.token == token)
    }

    pub fn count(&self, kind: TimerKind) -> usize {
        self.timers.iter().filter(|t| t.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

/// Scheduler on a virtual clock.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now_ms: u64,
    queue: TimerQueue,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `ms`.
    pub fn advance(&mut self, ms: u64) {
        self.now_ms = self.now_ms.saturating_add(ms);
    }

    /// Set the clock; it never moves backwards.
    pub fn set_time(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn queue(&self) -> &TimerQueue {
        &self.queue
    }
}

impl Scheduler for ManualScheduler {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn schedule(&mut self, delay_ms: u64, kind: TimerKind) -> TimerToken {
        self.queue.insert(self.now_ms.saturating_add(delay_ms), kind)
    }

    fn cancel(&mut self, token: TimerToken) -> bool {
        self.queue.remove(token)
    }

    fn take_due(&mut self) -> Vec<Fired> {
        self.queue.pop_due(self.now_ms)
    }

    fn next_deadline(&self) -> Option<u64> {
        self.queue.next_deadline()
    }

    fn is_pending(&self, token: TimerToken) -> bool {
        self.queue.contains(token)
    }

    fn pending(&self, kind: TimerKind) -> usize {
        self.queue.count(kind)
    }
}

/// Scheduler on the monotonic system clock.
#[derive(Debug)]
pub struct ClockScheduler {
    epoch: Instant,
    queue: TimerQueue,
}

impl Default for ClockScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockScheduler {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            queue: TimerQueue::new(),
        }
    }

    /// Block until the earliest timer is due. Returns `false` when nothing is
    /// scheduled.
    pub fn wait(&self) -> bool {
        let Some(deadline) = self.queue.next_deadline() else {
            return false;
        };
        let now = self.now_ms();
        if deadline > now {
            std::thread::sleep(Duration::from_millis(deadline - now));
        }
        true
    }
}

impl Scheduler for ClockScheduler {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn schedule(&mut self, delay_ms: u64, kind: TimerKind) -> TimerToken {
        let deadline = self.now_ms().saturating_add(delay_ms);
        self.queue.insert(deadline, kind)
    }

    fn cancel(&mut self, token: TimerToken) -> bool {
        self.queue.remove(token)
    }

    fn take_due(&mut self) -> Vec<Fired> {
        let now = self.now_ms();
        self.queue.pop_due(now)
    }

    fn next_deadline(&self) -> Option<u64> {
        self.queue.next_deadline()
    }

    fn is_pending(&self, token: TimerToken) -> bool {
        self.queue.contains(token)
    }

    fn pending(&self, kind: TimerKind) -> usize {
        self.queue.count(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_timers_fire_in_deadline_order() {
        let mut scheduler = ManualScheduler::new();
        let late = scheduler.schedule(300, TimerKind::SearchDebounce);
        let early = scheduler.schedule(50, TimerKind::Continuous);
        let middle = scheduler.schedule(200, TimerKind::Advance);

        scheduler.advance(49);
        assert!(scheduler.take_due().is_empty());

        scheduler.advance(200);
        let fired: Vec<TimerToken> = scheduler.take_due().iter().map(|f| f.token).collect();
        assert_eq!(fired, vec![early, middle]);
        assert!(scheduler.is_pending(late));
        assert_eq!(scheduler.next_deadline(), Some(300));
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut scheduler = ManualScheduler::new();
        let token = scheduler.schedule(10, TimerKind::Advance);
        assert!(scheduler.cancel(token));
        assert!(!scheduler.cancel(token));
        scheduler.advance(100);
        assert!(scheduler.take_due().is_empty());
    }

    #[test]
    fn test_zero_delay_is_due_immediately() {
        let mut scheduler = ManualScheduler::new();
        scheduler.advance(5);
        let token = scheduler.schedule(0, TimerKind::Advance);
        assert_eq!(scheduler.take_due().first().map(|f| f.token), Some(token));
    }

    #[test]
    fn test_equal_deadlines_keep_scheduling_order() {
        let mut scheduler = ManualScheduler::new();
        let a = scheduler.schedule(10, TimerKind::Advance);
        let b = scheduler.schedule(10, TimerKind::Continuous);
        scheduler.advance(10);
        let fired: Vec<TimerToken> = scheduler.take_due().iter().map(|f| f.token).collect();
        assert_eq!(fired, vec![a, b]);
    }

    #[test]
    fn test_pending_by_kind() {
        let mut scheduler = ManualScheduler::new();
        scheduler.schedule(10, TimerKind::Advance);
        scheduler.schedule(10, TimerKind::SearchDebounce);
        assert_eq!(scheduler.pending(TimerKind::Advance), 1);
        assert_eq!(scheduler.pending(TimerKind::Continuous), 0);
    }

    #[test]
    fn test_clock_never_goes_backwards() {
        let mut scheduler = ManualScheduler::new();
        scheduler.set_time(100);
        scheduler.set_time(50);
        assert_eq!(scheduler.now_ms(), 100);
    }
}
