//! Prelude module for common imports

pub use crate::executor::{JobStatus, WorkerConfig, WorkerPool};
pub use crate::runner::{
    DEFAULT_PARALLELISM, FailureRecord, Job, JobFailure, JobResult, JobRunner, JobRunnerBuilder,
    NamedJob, RunnerError, RunnerResult, RunnerState, RunnerStats, SharedJob, shared,
};
