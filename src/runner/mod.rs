//! Runner domain: jobs, lifecycle states, statistics and the runner itself

pub mod errors;
mod fail_fast;
pub mod job;
mod job_runner;
pub mod state;
pub mod stats;

pub use errors::{JobFailure, JobResult, Result as RunnerResult, RunnerError};
pub use fail_fast::FailureRecord;
pub use job::{Job, NamedJob, SharedJob, shared};
pub use job_runner::{DEFAULT_PARALLELISM, JobRunner, JobRunnerBuilder};
pub use state::RunnerState;
pub use stats::RunnerStats;
