//! Timer Registry
//!
//! Every delayed or repeating piece of work a screen starts goes through a
//! [`TimerRegistry`] owned by that screen instance. The registry never runs
//! code itself: a timer carries a typed message, and firing hands the message
//! back to the owner, which applies it to its own state.
//!
//! # Ordering
//!
//! Timers fire in due order on the session clock. Ties on the same due time
//! are broken by scheduling order (FIFO). A zero delay means "the next time
//! the owner drains its timers", never inside the call that scheduled it.
//!
//! # Invalidation
//!
//! Each handle records the registry generation it was created in.
//! [`TimerRegistry::cancel_all`] bumps the generation, so a handle (or an
//! entry) from before teardown can never be considered live again. Liveness is
//! re-checked at the moment an entry is popped, which covers timers that were
//! already due when a sibling handler cancelled them.
//!
//! ```text
//!   schedule ──► queue (due, seq) ──► pop_due ──► live? ──► Fired<M>
//!                     ▲                              │
//!                     └──── repeating re-enqueue ◄───┘
//! ```

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::time::Duration;

use tracing::{debug, trace};

/// Smallest interval a repeating timer is allowed to use
pub const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

/// Opaque handle to a scheduled timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
    generation: u64,
}

impl TimerHandle {
    /// Registry-unique timer id
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Registry generation the timer was created in
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}@g{}", self.id, self.generation)
    }
}

/// A timer that came due, returned to the owner for handling
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fired<M> {
    /// Handle of the timer that fired
    pub handle: TimerHandle,
    /// Session time the timer was due at
    pub due: Duration,
    /// The message the owner scheduled
    pub message: M,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Recurrence {
    Once,
    Every(Duration),
}

struct Entry<M> {
    due: Duration,
    seq: u64,
    handle: TimerHandle,
    recurrence: Recurrence,
    message: M,
}

// BinaryHeap is a max-heap; invert so the earliest (due, seq) pops first.
impl<M> Ord for Entry<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<M> PartialOrd for Entry<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M> PartialEq for Entry<M> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<M> Eq for Entry<M> {}

/// Per-owner scheduler on the session clock
pub struct TimerRegistry<M> {
    owner: &'static str,
    now: Duration,
    generation: u64,
    next_id: u64,
    next_seq: u64,
    live: HashSet<u64>,
    queue: BinaryHeap<Entry<M>>,
    fired: u64,
    cancelled: u64,
}

impl<M> TimerRegistry<M> {
    /// Create an empty registry whose clock starts at `now`
    #[must_use]
    pub fn new(owner: &'static str, now: Duration) -> Self {
        Self {
            owner,
            now,
            generation: 0,
            next_id: 0,
            next_seq: 0,
            live: HashSet::new(),
            queue: BinaryHeap::new(),
            fired: 0,
            cancelled: 0,
        }
    }

    /// Name of the owning screen or component (for logs)
    #[must_use]
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Current registry clock
    ///
    /// While a handler runs this is the due time of the timer being handled.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Current invalidation generation
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of timers waiting to fire
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Total number of deliveries so far
    #[must_use]
    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    /// Total number of timers cancelled before delivery
    #[must_use]
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }

    /// Due time of the earliest pending timer
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.peek().map(|entry| entry.due)
    }

    /// Whether `handle` can still fire
    #[must_use]
    pub fn is_live(&self, handle: TimerHandle) -> bool {
        handle.generation == self.generation && self.live.contains(&handle.id)
    }

    /// Schedule `message` to fire once after `delay`
    pub fn schedule(&mut self, delay: Duration, message: M) -> TimerHandle {
        self.enqueue(delay, Recurrence::Once, message)
    }

    /// Cancel one timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        self.live.remove(&handle.id);
        self.queue.retain(|entry| entry.handle != handle);
        self.cancelled += 1;
        trace!(owner = self.owner, timer = %handle, "timer cancelled");
        true
    }

    /// Cancel every pending timer and invalidate all outstanding handles
    ///
    /// Safe to call any number of times. Returns how many timers were still
    /// pending.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.live.len();
        self.live.clear();
        self.queue.clear();
        self.generation += 1;
        self.cancelled += count as u64;
        if count > 0 {
            debug!(
                owner = self.owner,
                cancelled = count,
                generation = self.generation,
                "cancelled pending timers"
            );
        }
        count
    }

    fn enqueue(&mut self, delay: Duration, recurrence: Recurrence, message: M) -> TimerHandle {
        let handle = TimerHandle {
            id: self.next_id,
            generation: self.generation,
        };
        self.next_id += 1;
        self.live.insert(handle.id);
        let due = self.now + delay;
        self.push(due, handle, recurrence, message);
        trace!(
            owner = self.owner,
            timer = %handle,
            due_ms = due.as_millis() as u64,
            "timer scheduled"
        );
        handle
    }

    fn push(&mut self, due: Duration, handle: TimerHandle, recurrence: Recurrence, message: M) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Entry {
            due,
            seq,
            handle,
            recurrence,
            message,
        });
    }
}

impl<M: Clone> TimerRegistry<M> {
    /// Schedule `message` to fire every `interval` until cancelled
    ///
    /// The first delivery happens one interval from now. Intervals shorter
    /// than [`MIN_REPEAT_INTERVAL`] are raised to it.
    pub fn schedule_repeating(&mut self, interval: Duration, message: M) -> TimerHandle {
        let interval = interval.max(MIN_REPEAT_INTERVAL);
        self.enqueue(interval, Recurrence::Every(interval), message)
    }

    /// Pop the next timer due at or before `now`
    ///
    /// Advances the registry clock to the fired timer's due time, or to `now`
    /// once nothing else is due. Call in a loop until it returns `None`,
    /// handling each message before popping the next one.
    pub fn pop_due(&mut self, now: Duration) -> Option<Fired<M>> {
        while let Some(top) = self.queue.peek() {
            if top.due > now {
                break;
            }
            let Some(entry) = self.queue.pop() else {
                break;
            };
            self.now = self.now.max(entry.due);

            if !self.is_live(entry.handle) {
                trace!(owner = self.owner, timer = %entry.handle, "dropped stale timer");
                continue;
            }

            let message = match entry.recurrence {
                Recurrence::Once => {
                    self.live.remove(&entry.handle.id);
                    entry.message
                }
                Recurrence::Every(interval) => {
                    let message = entry.message.clone();
                    self.push(
                        entry.due + interval,
                        entry.handle,
                        entry.recurrence,
                        entry.message,
                    );
                    message
                }
            };

            self.fired += 1;
            trace!(
                owner = self.owner,
                timer = %entry.handle,
                due_ms = entry.due.as_millis() as u64,
                "timer fired"
            );
            return Some(Fired {
                handle: entry.handle,
                due: entry.due,
                message,
            });
        }

        self.now = self.now.max(now);
        None
    }
}

impl<M> Drop for TimerRegistry<M> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl<M> fmt::Debug for TimerRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("owner", &self.owner)
            .field("now", &self.now)
            .field("generation", &self.generation)
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn drain(timers: &mut TimerRegistry<&'static str>, now: Duration) -> Vec<&'static str> {
        let mut out = Vec::new();
        while let Some(fired) = timers.pop_due(now) {
            out.push(fired.message);
        }
        out
    }

    #[test]
    fn test_fires_in_due_order() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        timers.schedule(ms(300), "c");
        timers.schedule(ms(100), "a");
        timers.schedule(ms(200), "b");

        assert_eq!(drain(&mut timers, ms(1_000)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_same_deadline_is_fifo() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        timers.schedule(ms(50), "first");
        timers.schedule(ms(50), "second");
        timers.schedule(ms(50), "third");

        assert_eq!(
            drain(&mut timers, ms(50)),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_nothing_fires_before_due() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        timers.schedule(ms(100), "late");

        assert!(drain(&mut timers, ms(99)).is_empty());
        assert_eq!(timers.now(), ms(99));
        assert_eq!(drain(&mut timers, ms(100)), vec!["late"]);
    }

    #[test]
    fn test_zero_delay_is_deferred() {
        let mut timers = TimerRegistry::new("test", ms(10));
        let handle = timers.schedule(Duration::ZERO, "now");

        // Scheduling never delivers; it waits for the next drain.
        assert!(timers.is_live(handle));
        assert_eq!(timers.pending(), 1);
        assert_eq!(timers.next_deadline(), Some(ms(10)));
        assert_eq!(drain(&mut timers, ms(10)), vec!["now"]);
    }

    #[test]
    fn test_cancel_prevents_delivery() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let keep = timers.schedule(ms(10), "keep");
        let dropped = timers.schedule(ms(10), "dropped");

        assert!(timers.cancel(dropped));
        assert!(!timers.cancel(dropped));
        assert!(timers.is_live(keep));
        assert_eq!(drain(&mut timers, ms(10)), vec!["keep"]);
        assert_eq!(timers.cancelled_count(), 1);
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let handle = timers.schedule(ms(5), "once");
        assert_eq!(drain(&mut timers, ms(5)), vec!["once"]);
        assert!(!timers.cancel(handle));
        assert!(!timers.is_live(handle));
    }

    #[test]
    fn test_cancel_inside_handler_blocks_due_sibling() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        timers.schedule(ms(20), "a");
        let b = timers.schedule(ms(20), "b");

        // Both are due; handling "a" cancels "b" before it is popped.
        let first = timers.pop_due(ms(20)).map(|f| f.message);
        assert_eq!(first, Some("a"));
        assert!(timers.cancel(b));
        assert!(timers.pop_due(ms(20)).is_none());
    }

    #[test]
    fn test_cancel_all_is_idempotent() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        timers.schedule(ms(10), "a");
        timers.schedule(ms(20), "b");
        timers.schedule_repeating(ms(5), "tick");

        assert_eq!(timers.cancel_all(), 3);
        assert_eq!(timers.cancel_all(), 0);
        assert_eq!(timers.pending(), 0);
        assert!(drain(&mut timers, ms(1_000)).is_empty());
    }

    #[test]
    fn test_old_generation_handles_stay_dead() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let before = timers.schedule(ms(10), "before");
        timers.cancel_all();
        let after = timers.schedule(ms(10), "after");

        assert_ne!(before.generation(), after.generation());
        assert!(!timers.is_live(before));
        assert!(!timers.cancel(before));
        assert_eq!(drain(&mut timers, ms(10)), vec!["after"]);
    }

    #[test]
    fn test_repeating_fires_each_interval() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let handle = timers.schedule_repeating(ms(100), "tick");

        assert!(drain(&mut timers, ms(99)).is_empty());
        assert_eq!(drain(&mut timers, ms(350)), vec!["tick", "tick", "tick"]);
        assert!(timers.is_live(handle));

        assert!(timers.cancel(handle));
        assert!(drain(&mut timers, ms(1_000)).is_empty());
    }

    #[test]
    fn test_zero_repeat_interval_is_clamped() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        timers.schedule_repeating(Duration::ZERO, "spin");

        assert_eq!(timers.next_deadline(), Some(MIN_REPEAT_INTERVAL));
        assert_eq!(drain(&mut timers, ms(3)).len(), 3);
    }

    #[test]
    fn test_clock_follows_fired_due_time() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        timers.schedule(ms(100), "a");

        let fired = timers.pop_due(ms(500)).map(|f| f.due);
        assert_eq!(fired, Some(ms(100)));
        assert_eq!(timers.now(), ms(100));

        // A follow-up scheduled from the handler is relative to the due time.
        timers.schedule(ms(100), "b");
        assert_eq!(timers.next_deadline(), Some(ms(200)));
        assert_eq!(drain(&mut timers, ms(500)), vec!["b"]);
        assert_eq!(timers.now(), ms(500));
    }
}
