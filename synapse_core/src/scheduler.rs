//! One-shot deferred transitions.
//!
//! Timers are never removed when playback pauses or resets. Instead every
//! timer is stamped with the [`Generation`] current at scheduling time, and
//! a timer whose generation is no longer current is discarded when it
//! comes due.

use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;
use tracing::debug;

/// Deferred effects the controller can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionEvent {
    /// Move the process indicator to the given stage
    EnterStage(Stage),

    /// Open sodium channels and start the depolarization visual
    TriggerPostsynaptic,

    /// The depolarization visual has run its course
    DepolarizationComplete,

    /// Restore entities and return to idle
    ResetCycle,

    /// Launch the next action potential (or halt at the loop limit)
    StartCycle,
}

/// Cancellation token for scheduled timers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

/// A timer that has come due and is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredEvent {
    /// Time the timer was due (may be earlier than the frame that fired it)
    pub due: Duration,
    pub event: TransitionEvent,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledEvent {
    due: Duration,
    seq: u64,
    generation: Generation,
    event: TransitionEvent,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Equal due times fire in scheduling order
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Min-heap of fire-once timers keyed by due time.
#[derive(Debug, Default)]
pub struct TransitionScheduler {
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    next_seq: u64,
    generation: Generation,
    stale_discarded: u64,
}

impl TransitionScheduler {
    /// Creates an empty scheduler at generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidates every outstanding timer. Returns the new generation.
    pub fn cancel_all(&mut self) -> Generation {
        self.generation = Generation(self.generation.0 + 1);
        debug!("Timers invalidated (generation {})", self.generation.0);
        self.generation
    }

    /// Schedules `event` to fire `delay` after `now`.
    pub fn schedule(&mut self, now: Duration, delay: Duration, event: TransitionEvent) {
        let due = now + delay;
        let seq = self.next_seq;
        self.next_seq += 1;

        debug!("Scheduled {:?} at {}ms", event, due.as_millis());
        self.heap.push(Reverse(ScheduledEvent {
            due,
            seq,
            generation: self.generation,
            event,
        }));
    }

    /// Pops the earliest timer due at or before `now`.
    ///
    /// Stale timers encountered on the way are dropped and counted.
    pub fn pop_due(&mut self, now: Duration) -> Option<FiredEvent> {
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.due > now {
                return None;
            }
            let Reverse(timer) = self.heap.pop()?;
            if timer.generation != self.generation {
                self.stale_discarded += 1;
                debug!("Discarded stale {:?} (generation {})", timer.event, timer.generation.0);
                continue;
            }
            return Some(FiredEvent {
                due: timer.due,
                event: timer.event,
            });
        }
        None
    }

    /// Number of outstanding timers that will still fire.
    pub fn pending(&self) -> usize {
        self.heap
            .iter()
            .filter(|Reverse(timer)| timer.generation == self.generation)
            .count()
    }

    /// Due time of the earliest live timer.
    #[cfg(test)]
    pub fn next_due(&self) -> Option<Duration> {
        self.heap
            .iter()
            .filter(|Reverse(timer)| timer.generation == self.generation)
            .map(|Reverse(timer)| timer.due)
            .min()
    }

    /// Timers dropped because their generation was cancelled.
    pub fn stale_discarded(&self) -> u64 {
        self.stale_discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_fires_in_due_order() {
        let mut scheduler = TransitionScheduler::new();
        scheduler.schedule(ms(0), ms(400), TransitionEvent::ResetCycle);
        scheduler.schedule(ms(0), ms(300), TransitionEvent::StartCycle);

        assert_eq!(scheduler.pop_due(ms(299)), None);

        let first = scheduler.pop_due(ms(1000)).unwrap();
        assert_eq!(first.event, TransitionEvent::StartCycle);
        assert_eq!(first.due, ms(300));

        let second = scheduler.pop_due(ms(1000)).unwrap();
        assert_eq!(second.event, TransitionEvent::ResetCycle);
        assert_eq!(scheduler.pop_due(ms(1000)), None);
    }

    #[test]
    fn test_equal_due_fires_in_schedule_order() {
        let mut scheduler = TransitionScheduler::new();
        scheduler.schedule(ms(0), ms(100), TransitionEvent::TriggerPostsynaptic);
        scheduler.schedule(ms(0), ms(100), TransitionEvent::DepolarizationComplete);

        assert_eq!(
            scheduler.pop_due(ms(100)).unwrap().event,
            TransitionEvent::TriggerPostsynaptic
        );
        assert_eq!(
            scheduler.pop_due(ms(100)).unwrap().event,
            TransitionEvent::DepolarizationComplete
        );
    }

    #[test]
    fn test_fires_exactly_once() {
        let mut scheduler = TransitionScheduler::new();
        scheduler.schedule(ms(0), ms(10), TransitionEvent::EnterStage(Stage::CalciumOpen));

        assert!(scheduler.pop_due(ms(10)).is_some());
        assert!(scheduler.pop_due(ms(20)).is_none());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_cancelled_generation_is_discarded() {
        let mut scheduler = TransitionScheduler::new();
        scheduler.schedule(ms(0), ms(300), TransitionEvent::EnterStage(Stage::CalciumOpen));
        assert_eq!(scheduler.pending(), 1);

        scheduler.cancel_all();
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.next_due(), None);

        scheduler.schedule(ms(100), ms(300), TransitionEvent::StartCycle);

        let fired = scheduler.pop_due(ms(1000)).unwrap();
        assert_eq!(fired.event, TransitionEvent::StartCycle);
        assert_eq!(scheduler.stale_discarded(), 1);
    }

    #[test]
    fn test_next_due_ignores_stale() {
        let mut scheduler = TransitionScheduler::new();
        scheduler.schedule(ms(0), ms(50), TransitionEvent::ResetCycle);
        scheduler.cancel_all();
        scheduler.schedule(ms(0), ms(80), TransitionEvent::StartCycle);

        assert_eq!(scheduler.next_due(), Some(ms(80)));
    }
}
