//! Core scheduling abstractions: admission, pacing, supervision, outcomes.

pub mod error;
pub mod events;
pub mod scheduler;
pub(crate) mod supervisor;
pub mod work;

pub use error::{AppResult, SchedulerError, WorkError};
pub use events::{build_event, EventKind, EventSink, InMemoryEventSink, SchedulerEvent};
pub use scheduler::{Scheduler, SchedulerStats, SchedulerStatus, Spawn};
pub use work::{FnWork, SubmitOptions, TaskHandle, WorkUnit};
