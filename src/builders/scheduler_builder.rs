//! Builders to construct schedulers from validated configuration.

use crate::config::SchedulerConfig;
use crate::core::{Scheduler, SchedulerError, Spawn};

/// Validate `config` and construct a scheduler that dispatches on `spawner`.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidConfig`] when the configuration fails
/// validation.
pub fn build_scheduler<T, S>(
    config: SchedulerConfig,
    spawner: S,
) -> Result<Scheduler<T, S>, SchedulerError>
where
    T: Send + 'static,
    S: Spawn + Clone + Send + Sync + 'static,
{
    config.validate().map_err(SchedulerError::InvalidConfig)?;
    Ok(Scheduler::new(config, spawner))
}
