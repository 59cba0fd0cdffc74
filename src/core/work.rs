//! Work abstractions: the caller-supplied unit of work and its outcome handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::error::{SchedulerError, WorkError};

/// A caller-supplied, re-invocable unit of asynchronous work.
///
/// The scheduler never inspects the work beyond awaiting it; `run` is invoked
/// once per dispatch, including each retry dispatch.
#[async_trait]
pub trait WorkUnit<T>: Send + Sync + 'static {
    /// Execute the work once, producing a value or a provider failure.
    async fn run(&self) -> Result<T, WorkError>;
}

/// Adapter turning an async closure into a [`WorkUnit`].
pub struct FnWork<F> {
    f: F,
}

impl<F> FnWork<F> {
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, F, Fut> WorkUnit<T> for FnWork<F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
{
    async fn run(&self) -> Result<T, WorkError> {
        (self.f)().await
    }
}

/// Per-submission knobs. Unset fields fall back to the scheduler defaults.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Initial ordering weight; higher dispatches sooner.
    pub priority: i64,
    /// Cap on rate-limit-triggered retries.
    pub max_retries: Option<usize>,
    /// Total wall-clock budget before the outcome is forced to a timeout.
    /// Must be non-zero when set.
    pub timeout: Option<Duration>,
}

impl SubmitOptions {
    /// Options with an explicit priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Options with an explicit retry cap.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Options with an explicit timeout budget.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Single-use resolution slot shared between the queue, the supervisor, and
/// the timeout watchdog. Taking the sender is the point of no return; any
/// later resolution attempt is a no-op.
pub(crate) struct OutcomeSlot<T> {
    tx: Mutex<Option<oneshot::Sender<Result<T, SchedulerError>>>>,
}

impl<T> OutcomeSlot<T> {
    pub(crate) fn new() -> (Arc<Self>, oneshot::Receiver<Result<T, SchedulerError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                tx: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }

    /// Resolve the outcome unless something resolved it first. Returns
    /// whether this call won the race.
    pub(crate) fn resolve(&self, outcome: Result<T, SchedulerError>) -> bool {
        match self.tx.lock().take() {
            Some(tx) => {
                // The receiver side may already be dropped; that is fine.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.tx.lock().is_none()
    }
}

/// One admitted unit of work, alive from submission until its handle resolves.
pub(crate) struct WorkItem<T> {
    pub(crate) id: Uuid,
    pub(crate) work: Arc<dyn WorkUnit<T>>,
    pub(crate) priority: i64,
    pub(crate) retry_count: usize,
    pub(crate) max_retries: usize,
    /// Submission sequence number; breaks priority ties FIFO.
    pub(crate) seq: u64,
    pub(crate) outcome: Arc<OutcomeSlot<T>>,
}

/// Outcome handle returned by `submit`; resolves exactly once.
pub struct TaskHandle<T> {
    id: Uuid,
    rx: oneshot::Receiver<Result<T, SchedulerError>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(id: Uuid, rx: oneshot::Receiver<Result<T, SchedulerError>>) -> Self {
        Self { id, rx }
    }

    /// Identifier of the submitted item, for lookup and log correlation.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, SchedulerError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(SchedulerError::Shutdown { id: this.id })),
            Poll::Pending => Poll::Pending,
        }
    }
}
