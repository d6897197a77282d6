//! Simulation runtime error types.

use thiserror::Error;

/// Errors that can occur when launching simulated work.
#[derive(Debug, Error)]
pub enum SimError {
    /// No async runtime is reachable from the calling context, so the
    /// process timer cannot be scheduled. Propagated to the placement
    /// caller; there is no built-in retry.
    #[error("no async runtime available to schedule the process timer")]
    SchedulerUnavailable,
}

pub type SimResult<T> = Result<T, SimError>;
