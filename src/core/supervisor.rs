//! Per-item execution lifecycle.
//!
//! One supervisor run covers one dispatch: invoke the work, classify the
//! failure, either park the item for backoff re-admission or resolve the
//! caller's handle. Every path releases the concurrency slot exactly once
//! and wakes the pacing loop.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::core::error::SchedulerError;
use crate::core::events::EventKind;
use crate::core::scheduler::Shared;
use crate::core::work::WorkItem;

/// Drive one dispatch of `item` to completion, retry re-admission, or
/// terminal failure.
pub(crate) async fn run<T: Send + 'static>(shared: Arc<Shared<T>>, mut item: WorkItem<T>) {
    let result = item.work.run().await;
    match result {
        Ok(value) => {
            let won = item.outcome.resolve(Ok(value));
            {
                let mut inner = shared.inner.lock();
                inner.active = inner.active.saturating_sub(1);
                if won {
                    inner.stats.total_completed += 1;
                }
            }
            if won {
                debug!(id = %item.id, attempts = item.retry_count + 1, "task completed");
                shared.record_event(
                    item.id,
                    EventKind::Completed,
                    item.priority,
                    item.retry_count + 1,
                );
            } else {
                debug!(id = %item.id, "late result discarded");
            }
            shared.wake.notify_one();
        }
        Err(err) if err.is_rate_limit() && item.retry_count < item.max_retries => {
            item.retry_count += 1;
            item.priority = item.priority.saturating_add(shared.config.priority_escalation);
            let delay = shared.config.backoff_delay(item.retry_count);
            let ready_at = Instant::now() + delay;
            warn!(
                id = %item.id,
                retry = item.retry_count,
                ?delay,
                priority = item.priority,
                "provider throttled; backing off"
            );

            let id = item.id;
            let priority = item.priority;
            let attempt = item.retry_count;
            let parked = {
                let mut inner = shared.inner.lock();
                inner.active = inner.active.saturating_sub(1);
                if item.outcome.is_resolved() {
                    // Timed out during the attempt; nothing left to re-admit.
                    false
                } else {
                    inner.delayed.push(item, ready_at);
                    inner.stats.total_retried += 1;
                    inner.note_depth();
                    true
                }
            };
            if parked {
                shared.record_event(id, EventKind::Retried, priority, attempt);
            } else {
                debug!(%id, "dropping retry for already-resolved item");
            }
            shared.wake.notify_one();
        }
        Err(err) => {
            let attempts = item.retry_count + 1;
            let outcome = if err.is_rate_limit() {
                SchedulerError::RetryExhausted {
                    source: err,
                    attempts,
                }
            } else {
                SchedulerError::TaskFailed {
                    source: err,
                    attempts,
                }
            };
            warn!(id = %item.id, attempts, error = %outcome, "task failed");
            let won = item.outcome.resolve(Err(outcome));
            {
                let mut inner = shared.inner.lock();
                inner.active = inner.active.saturating_sub(1);
                if won {
                    inner.stats.total_failed += 1;
                }
            }
            if won {
                shared.record_event(item.id, EventKind::Failed, item.priority, attempts);
            }
            shared.wake.notify_one();
        }
    }
}
