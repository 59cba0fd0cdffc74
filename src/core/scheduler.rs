//! Admission control, ordering, and pacing.
//!
//! A [`Scheduler`] owns the pending-work collections and the in-flight count.
//! A single pacing loop per instance decides, at each decision point, whether
//! the next eligible item may start now, must wait for a concurrency slot, or
//! must wait for the minimum dispatch interval to elapse. The loop runs only
//! while there is work and exits when idle; `submit` restarts it.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::core::error::{SchedulerError, WorkError};
use crate::core::events::{build_event, EventKind, EventSink};
use crate::core::supervisor;
use crate::core::work::{FnWork, OutcomeSlot, SubmitOptions, TaskHandle, WorkItem, WorkUnit};
use crate::infra::queue::{DelayHeap, ReadyQueue};

/// Abstraction for spawning supervised executions on a runtime.
pub trait Spawn {
    /// Spawn an async task that runs to completion on its own.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Counters tracked across a scheduler's lifetime.
#[derive(Debug, Default, Clone)]
pub struct SchedulerStats {
    /// Items accepted by `submit`.
    pub total_submitted: u64,
    /// Dispatches handed to supervisors, retries included.
    pub total_dispatched: u64,
    /// Items resolved with a value.
    pub total_completed: u64,
    /// Retry re-admissions after provider throttling.
    pub total_retried: u64,
    /// Items resolved with a terminal failure.
    pub total_failed: u64,
    /// Items resolved by the timeout watchdog.
    pub total_timed_out: u64,
    /// Largest observed pending depth.
    pub peak_queue_depth: usize,
    /// Largest observed in-flight count.
    pub peak_active: u32,
}

/// Point-in-time snapshot for observability. Not a correctness surface;
/// callers must not gate decisions on it.
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    /// Items waiting to execute: ready plus parked retries.
    pub queue_length: usize,
    /// Items currently executing.
    pub active: u32,
    /// Whether the pacing loop is currently running.
    pub loop_running: bool,
    /// Lifetime counters.
    pub stats: SchedulerStats,
}

/// State behind the scheduler mutex. Critical sections are short and never
/// held across an await.
pub(crate) struct Inner<T> {
    pub(crate) ready: ReadyQueue<T>,
    pub(crate) delayed: DelayHeap<T>,
    pub(crate) active: u32,
    pub(crate) last_dispatch: Option<Instant>,
    pub(crate) loop_running: bool,
    pub(crate) stats: SchedulerStats,
}

impl<T> Inner<T> {
    pub(crate) fn pending_depth(&self) -> usize {
        self.ready.len() + self.delayed.len()
    }

    pub(crate) fn note_depth(&mut self) {
        let depth = self.pending_depth();
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(depth);
    }
}

/// Shared scheduler state reachable from the loop, supervisors, and
/// watchdogs.
pub(crate) struct Shared<T> {
    pub(crate) config: SchedulerConfig,
    pub(crate) inner: Mutex<Inner<T>>,
    pub(crate) wake: Notify,
    pub(crate) seq: AtomicU64,
    pub(crate) events: Mutex<Option<Box<dyn EventSink>>>,
}

impl<T> Shared<T> {
    pub(crate) fn record_event(&self, item_id: Uuid, kind: EventKind, priority: i64, attempt: usize) {
        if let Some(sink) = self.events.lock().as_mut() {
            sink.record(build_event(item_id, kind, priority, attempt));
        }
    }

    /// Timeout watchdog endpoint: force-resolve an item that is still
    /// pending, wherever it currently sits. Removal of in-flight work is
    /// best-effort; a late result is discarded by the resolution slot.
    pub(crate) fn expire(&self, id: Uuid, slot: &OutcomeSlot<T>, priority: i64) {
        if !slot.resolve(Err(SchedulerError::Timeout { id })) {
            return;
        }
        {
            let mut inner = self.inner.lock();
            let removed = inner.ready.remove(id) || inner.delayed.remove(id);
            inner.stats.total_timed_out += 1;
            if removed {
                debug!(%id, "timed out while queued");
            } else {
                debug!(%id, "timed out in flight; any late result will be discarded");
            }
        }
        warn!(%id, "task timed out");
        self.record_event(id, EventKind::TimedOut, priority, 0);
        self.wake.notify_one();
    }
}

/// Admission-controlled scheduler for calls to a rate-limited external
/// provider. Cheap to clone; clones share state.
pub struct Scheduler<T, S> {
    shared: Arc<Shared<T>>,
    spawner: S,
}

impl<T, S: Clone> Clone for Scheduler<T, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            spawner: self.spawner.clone(),
        }
    }
}

impl<T, S> Scheduler<T, S>
where
    T: Send + 'static,
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create a scheduler with the given configuration.
    ///
    /// The configuration is taken as-is; use
    /// [`crate::builders::build_scheduler`] to validate first.
    pub fn new(config: SchedulerConfig, spawner: S) -> Self {
        debug!(?config, "scheduler created");
        Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(Inner {
                    ready: ReadyQueue::new(),
                    delayed: DelayHeap::new(),
                    active: 0,
                    last_dispatch: None,
                    loop_running: false,
                    stats: SchedulerStats::default(),
                }),
                wake: Notify::new(),
                seq: AtomicU64::new(0),
                events: Mutex::new(None),
            }),
            spawner,
        }
    }

    /// Attach a lifecycle event sink.
    #[must_use]
    pub fn with_events(self, sink: Box<dyn EventSink>) -> Self {
        *self.shared.events.lock() = Some(sink);
        self
    }

    /// The configuration this scheduler was built with.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Admit a unit of work. Never blocks; the returned handle resolves
    /// exactly once with the work's value, a terminal failure, or a timeout,
    /// whichever occurs first.
    pub fn submit<W: WorkUnit<T>>(&self, work: W, options: SubmitOptions) -> TaskHandle<T> {
        self.admit(Arc::new(work), options)
    }

    /// Convenience for closure-shaped work.
    pub fn submit_fn<F, Fut>(&self, f: F, options: SubmitOptions) -> TaskHandle<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
    {
        self.admit(Arc::new(FnWork::new(f)), options)
    }

    /// Snapshot of queue depth, in-flight count, and loop state.
    #[must_use]
    pub fn status(&self) -> SchedulerStatus {
        let inner = self.shared.inner.lock();
        SchedulerStatus {
            queue_length: inner.pending_depth(),
            active: inner.active,
            loop_running: inner.loop_running,
            stats: inner.stats.clone(),
        }
    }

    fn admit(&self, work: Arc<dyn WorkUnit<T>>, options: SubmitOptions) -> TaskHandle<T> {
        let id = Uuid::new_v4();
        let seq = self.shared.seq.fetch_add(1, Ordering::Relaxed);
        let priority = options.priority;
        let max_retries = options
            .max_retries
            .unwrap_or(self.shared.config.default_max_retries);
        let budget = options
            .timeout
            .unwrap_or_else(|| self.shared.config.default_timeout());

        let (slot, rx) = OutcomeSlot::new();
        let item = WorkItem {
            id,
            work,
            priority,
            retry_count: 0,
            max_retries,
            seq,
            outcome: Arc::clone(&slot),
        };

        let start_loop = {
            let mut inner = self.shared.inner.lock();
            inner.ready.push(item);
            inner.stats.total_submitted += 1;
            inner.note_depth();
            if inner.loop_running {
                false
            } else {
                inner.loop_running = true;
                true
            }
        };

        debug!(%id, priority, max_retries, ?budget, "work admitted");
        self.shared.record_event(id, EventKind::Submitted, priority, 0);

        if start_loop {
            let shared = Arc::clone(&self.shared);
            let spawner = self.spawner.clone();
            self.spawner.spawn(pacing_loop(shared, spawner));
        }

        // Arm the timeout watchdog for this item.
        let shared = Arc::clone(&self.shared);
        self.spawner.spawn(async move {
            sleep(budget).await;
            shared.expire(id, &slot, priority);
        });

        self.shared.wake.notify_one();
        TaskHandle::new(id, rx)
    }
}

/// One decision made by the pacing loop while holding the state lock.
enum Step<T> {
    Dispatch(WorkItem<T>),
    WaitSlot,
    WaitInterval(Duration),
    WaitWork(Option<Duration>),
    Exit,
}

/// The singleton pacing loop. Runs while the queue is non-empty or items are
/// in flight; exits otherwise and is restarted by the next submission.
async fn pacing_loop<T, S>(shared: Arc<Shared<T>>, spawner: S)
where
    T: Send + 'static,
    S: Spawn + Clone + Send + Sync + 'static,
{
    debug!("pacing loop started");
    loop {
        let now = Instant::now();
        let step = {
            let mut inner = shared.inner.lock();

            // Promote retries whose backoff has elapsed.
            for item in inner.delayed.pop_due(now) {
                inner.ready.push(item);
            }

            if inner.active >= shared.config.max_concurrent {
                Step::WaitSlot
            } else if inner.ready.is_empty() {
                if inner.active > 0 || !inner.delayed.is_empty() {
                    let next_ready = inner
                        .delayed
                        .next_ready_at()
                        .map(|at| at.saturating_duration_since(now));
                    Step::WaitWork(next_ready)
                } else {
                    inner.loop_running = false;
                    Step::Exit
                }
            } else if let Some(gap) = interval_gap(&shared.config, inner.last_dispatch, now) {
                Step::WaitInterval(gap)
            } else if let Some(item) = inner.ready.pop() {
                inner.active += 1;
                inner.stats.total_dispatched += 1;
                inner.stats.peak_active = inner.stats.peak_active.max(inner.active);
                inner.last_dispatch = Some(now);
                Step::Dispatch(item)
            } else {
                Step::WaitWork(None)
            }
        };

        match step {
            Step::Dispatch(item) => {
                debug!(
                    id = %item.id,
                    priority = item.priority,
                    attempt = item.retry_count + 1,
                    "dispatching"
                );
                shared.record_event(
                    item.id,
                    EventKind::Dispatched,
                    item.priority,
                    item.retry_count + 1,
                );
                spawner.spawn(supervisor::run(Arc::clone(&shared), item));
            }
            Step::WaitSlot => {
                let _ = timeout(shared.config.poll_interval(), shared.wake.notified()).await;
            }
            Step::WaitInterval(gap) => sleep(gap).await,
            Step::WaitWork(next_ready) => {
                let bound = next_ready
                    .unwrap_or_else(|| shared.config.poll_interval())
                    .max(Duration::from_millis(1));
                let _ = timeout(bound, shared.wake.notified()).await;
            }
            Step::Exit => break,
        }
    }
    debug!("pacing loop exited");
}

/// Remaining wait before the minimum inter-dispatch interval is satisfied.
fn interval_gap(config: &SchedulerConfig, last: Option<Instant>, now: Instant) -> Option<Duration> {
    let min_gap = config.min_dispatch_interval();
    if min_gap.is_zero() {
        return None;
    }
    let elapsed = now.saturating_duration_since(last?);
    (elapsed < min_gap).then(|| min_gap - elapsed)
}
