//! Lifecycle event sinks.
//!
//! Provides an in-memory log of scheduling decisions for tests and
//! diagnostics. Event recording is best-effort and never part of the
//! correctness contract.

use std::collections::VecDeque;

use uuid::Uuid;

use crate::util::clock::now_ms;

/// What happened to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Accepted at submission.
    Submitted,
    /// Handed to a supervisor for execution.
    Dispatched,
    /// Parked for backoff after provider throttling.
    Retried,
    /// Resolved with the work's value.
    Completed,
    /// Resolved with a terminal failure.
    Failed,
    /// Resolved by the timeout watchdog.
    TimedOut,
}

/// One recorded lifecycle event.
#[derive(Debug, Clone)]
pub struct SchedulerEvent {
    /// Item the event belongs to.
    pub item_id: Uuid,
    /// What happened.
    pub kind: EventKind,
    /// Item priority at the time of the event.
    pub priority: i64,
    /// Dispatch attempts made so far; zero where not applicable.
    pub attempt: usize,
    /// Timestamp, milliseconds since the Unix epoch.
    pub at_ms: u128,
}

/// Sink for lifecycle events.
pub trait EventSink: Send {
    /// Record an event.
    fn record(&mut self, event: SchedulerEvent);
}

/// In-memory sink with a bounded buffer, for testing and dev.
pub struct InMemoryEventSink {
    events: VecDeque<SchedulerEvent>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<SchedulerEvent> {
        self.events.iter().cloned().collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&mut self, event: SchedulerEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Build an event stamped with the current wall clock.
#[must_use]
pub fn build_event(item_id: Uuid, kind: EventKind, priority: i64, attempt: usize) -> SchedulerEvent {
    SchedulerEvent {
        item_id,
        kind,
        priority,
        attempt,
        at_ms: now_ms(),
    }
}
