//! # Jobrunner - fail-fast batch job execution
//!
//! Jobrunner runs a fixed, finite batch of independent jobs on a bounded
//! pool of worker threads. The first failing job stops the batch: jobs that
//! have not started yet are withdrawn, jobs already running finish, and the
//! runner ends in the ERROR state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jobrunner::prelude::*;
//!
//! let mut runner = JobRunner::builder()
//!     .job(|| -> JobResult { Ok(()) })
//!     .job(NamedJob::new("index", || Ok(())))
//!     .parallelism(4)
//!     .build();
//!
//! assert_eq!(runner.state(), RunnerState::Ready);
//! runner.start()?;
//! assert_eq!(runner.state(), RunnerState::Finished);
//! # Ok::<(), RunnerError>(())
//! ```
//!
//! ## Lifecycle
//!
//! `INIT -> READY -> STARTED -> FINISHED | ERROR`. A runner is single-use:
//! `start` is only valid in READY.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod executor;
pub mod infrastructure;
pub mod runner;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use executor::{Completion, JobHandle, JobStatus, WorkerConfig, WorkerPool};
pub use infrastructure::{BatchFile, Config, ConfigError, SleepJob, init_logging};
pub use runner::{
    DEFAULT_PARALLELISM, FailureRecord, Job, JobFailure, JobResult, JobRunner, JobRunnerBuilder,
    NamedJob, RunnerError, RunnerState, RunnerStats, SharedJob,
};

/// Version of the jobrunner crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
