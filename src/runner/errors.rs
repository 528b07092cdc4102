//! Error types for the runner domain

use super::state::RunnerState;
use thiserror::Error;

/// Failure raised by a job body.
///
/// Job failures never cross the task boundary: the runner catches them,
/// records them and turns them into a fail-fast shutdown.
pub type JobFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by [`Job::execute`](super::Job::execute)
pub type JobResult = std::result::Result<(), JobFailure>;

/// Errors surfaced to callers of the runner
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    /// `start` was called outside the READY state
    #[error("Invalid state: {state}. Can only start runner on READY state")]
    InvalidState {
        /// State the runner was in when `start` was called.
        state: RunnerState,
    },

    /// A job failed and the batch was stopped
    #[error("Exception running job")]
    RunnerFailed,

    /// A task was submitted to a worker pool that has been shut down
    #[error("Worker pool is shut down, submission rejected")]
    PoolShutdown,

    /// The operating system refused to spawn a worker thread
    #[error("Failed to spawn worker thread: {reason}")]
    WorkerSpawn {
        /// Error reported by the OS.
        reason: String,
    },
}

/// Convenience alias for runner operations
pub type Result<T> = std::result::Result<T, RunnerError>;
