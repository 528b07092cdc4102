//! The job runner: lifecycle state machine and fail-fast orchestration

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use super::errors::{Result, RunnerError};
use super::fail_fast::{FailFast, FailureRecord};
use super::job::{Job, SharedJob};
use super::state::RunnerState;
use super::stats::RunnerStats;
use crate::executor::{JobHandle, WorkerConfig, WorkerPool};

/// Parallelism used when the caller supplies a non-positive bound
pub const DEFAULT_PARALLELISM: usize = 10;

/// Runs a fixed batch of jobs on a bounded pool, stopping at the first failure.
///
/// Jobs run in parallel and must be thread-safe. [`start`](Self::start)
/// blocks until every job has settled or a failure has stopped the pool.
/// Jobs that were already running when a sibling failed are not interrupted;
/// they finish in the background and the runner's pool joins them on drop.
pub struct JobRunner {
    parallelism: usize,
    stack_size: Option<usize>,
    jobs: Option<Arc<[SharedJob]>>,
    state: RunnerState,
    stats: RunnerStats,
    run_id: Uuid,
    policy: Option<Arc<FailFast>>,
    pool: Option<WorkerPool>,
}

impl JobRunner {
    /// Creates a runner for `jobs` with at most `parallelism` concurrent jobs.
    ///
    /// A non-positive `parallelism` falls back to [`DEFAULT_PARALLELISM`].
    /// An empty `jobs` leaves the runner in INIT.
    #[must_use]
    pub fn new(jobs: Vec<SharedJob>, parallelism: i64) -> Self {
        let mut runner = Self::with_parallelism(parallelism);
        if !jobs.is_empty() {
            runner.bind_jobs(jobs);
        }
        runner
    }

    /// Creates a runner in INIT with no jobs bound yet
    #[must_use]
    pub fn with_parallelism(parallelism: i64) -> Self {
        Self {
            parallelism: resolve_parallelism(parallelism),
            stack_size: None,
            jobs: None,
            state: RunnerState::Init,
            stats: RunnerStats::default(),
            run_id: Uuid::new_v4(),
            policy: None,
            pool: None,
        }
    }

    /// Starts a builder
    #[must_use]
    pub fn builder() -> JobRunnerBuilder {
        JobRunnerBuilder::default()
    }

    /// Binds the job list once.
    ///
    /// Only takes effect in INIT with no list bound and a non-empty `jobs`;
    /// otherwise nothing changes. Returns whether the list was bound.
    pub fn bind_jobs(&mut self, jobs: Vec<SharedJob>) -> bool {
        if self.jobs.is_some() || self.state != RunnerState::Init {
            debug!(state = %self.state, "Job list already bound, ignoring");
            return false;
        }
        if jobs.is_empty() {
            return false;
        }

        info!("Received {} job instances", jobs.len());
        self.jobs = Some(jobs.into());
        self.state = RunnerState::Ready;
        true
    }

    /// Runs every bound job and blocks until the batch settles.
    ///
    /// # Errors
    ///
    /// - [`RunnerError::InvalidState`] if the runner is not READY; the state
    ///   is left unchanged.
    /// - [`RunnerError::RunnerFailed`] if a job failed; the runner ends in
    ///   ERROR.
    /// - [`RunnerError::WorkerSpawn`] if the pool could not be created; the
    ///   runner stays READY.
    pub fn start(&mut self) -> Result<()> {
        let jobs = match (&self.jobs, self.state) {
            (Some(jobs), RunnerState::Ready) => Arc::clone(jobs),
            _ => {
                error!("JobRunner can't be started when it's in {} state", self.state);
                return Err(RunnerError::InvalidState { state: self.state });
            }
        };

        // More workers than jobs could never be busy at once.
        let mut config = WorkerConfig::new(self.parallelism.min(jobs.len()));
        if let Some(bytes) = self.stack_size {
            config = config.with_stack_size(bytes);
        }
        let pool = WorkerPool::new(config)?;

        let span = info_span!("run", run_id = %self.run_id);
        let _entered = span.enter();
        let started_at = Instant::now();
        self.state = RunnerState::Started;

        let policy = Arc::new(FailFast::new(pool.control()));
        let completion = pool.completion();

        for (index, job) in jobs.iter().enumerate() {
            let handle = Arc::new(JobHandle::new(index, job.name(), Arc::clone(&completion)));
            policy.track(Arc::clone(&handle));

            let task = wrap(index, Arc::clone(job), Arc::clone(&policy));
            if let Err(e) = pool.submit(Arc::clone(&handle), task) {
                debug!(job = index, error = %e, "Submission rejected, withdrawing job");
                handle.withdraw();
            }
        }

        completion.wait(jobs.len());

        let stats =
            RunnerStats::from_handles(self.state, &policy.handles(), started_at.elapsed());
        let failed = policy.is_triggered();

        self.state = if failed || stats.has_cancellations() {
            RunnerState::Error
        } else {
            RunnerState::Finished
        };
        self.stats = stats.with_state(self.state);
        info!(
            added = self.stats.added,
            running = self.stats.running,
            cancelled = self.stats.cancelled,
            finished = self.stats.finished,
            elapsed_ms = self.stats.elapsed_ms,
            "JobRunner status {}",
            self.state
        );

        if self.state == RunnerState::Finished {
            pool.shutdown();
        }
        self.policy = Some(policy);
        self.pool = Some(pool);

        if self.state == RunnerState::Error {
            error!("There was a problem running a job, please verify and run again once fixed");
            return Err(RunnerError::RunnerFailed);
        }

        info!("All jobs in this runner have finished correctly");
        Ok(())
    }

    /// Current lifecycle state; never blocks
    #[must_use]
    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Jobs whose body returned, as of the last settle
    #[must_use]
    pub fn finished_count(&self) -> usize {
        self.stats.finished
    }

    /// Counters as of the last settle
    #[must_use]
    pub fn stats(&self) -> RunnerStats {
        self.stats
    }

    /// Failures captured from job bodies, in the order they were observed
    #[must_use]
    pub fn failures(&self) -> Vec<FailureRecord> {
        self.policy
            .as_ref()
            .map(|policy| policy.failures())
            .unwrap_or_default()
    }

    /// Effective parallelism bound
    #[must_use]
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Number of bound jobs
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.as_ref().map_or(0, |jobs| jobs.len())
    }

    /// Identifier attached to this runner's tracing span
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("run_id", &self.run_id)
            .field("state", &self.state)
            .field("parallelism", &self.parallelism)
            .field("jobs", &self.job_count())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Builder binding the job list at construction time
#[derive(Default)]
pub struct JobRunnerBuilder {
    jobs: Vec<SharedJob>,
    parallelism: Option<i64>,
    stack_size: Option<usize>,
}

impl JobRunnerBuilder {
    /// Adds a job
    #[must_use]
    pub fn job(mut self, job: impl Job + 'static) -> Self {
        self.jobs.push(Arc::new(job));
        self
    }

    /// Adds already shared jobs
    #[must_use]
    pub fn jobs(mut self, jobs: impl IntoIterator<Item = SharedJob>) -> Self {
        self.jobs.extend(jobs);
        self
    }

    /// Sets the parallelism bound
    #[must_use]
    pub fn parallelism(mut self, parallelism: i64) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Sets the stack size of the worker threads
    #[must_use]
    pub fn worker_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Builds the runner
    #[must_use]
    pub fn build(self) -> JobRunner {
        let parallelism = self
            .parallelism
            .unwrap_or(DEFAULT_PARALLELISM as i64);
        let mut runner = JobRunner::new(self.jobs, parallelism);
        runner.stack_size = self.stack_size;
        runner
    }
}

fn resolve_parallelism(parallelism: i64) -> usize {
    if parallelism <= 0 {
        warn!(
            "Invalid number of parallel jobs received, using default value: {}",
            DEFAULT_PARALLELISM
        );
        return DEFAULT_PARALLELISM;
    }
    let parallelism = usize::try_from(parallelism).unwrap_or(usize::MAX);
    info!(
        "JobRunner initialized with provided value of {} max. parallel jobs",
        parallelism
    );
    parallelism
}

/// Wraps a job so that any failure is caught and handed to the fail-fast
/// policy instead of escaping the worker.
fn wrap(index: usize, job: SharedJob, policy: Arc<FailFast>) -> impl FnOnce() + Send + 'static {
    let span = tracing::Span::current();
    move || {
        let _entered = span.enter();
        info!(job = index, name = job.name(), "Job started");

        let message = match panic::catch_unwind(AssertUnwindSafe(|| job.execute())) {
            Ok(Ok(())) => {
                debug!(job = index, "Job finished");
                return;
            }
            Ok(Err(failure)) => failure.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        error!(job = index, name = job.name(), error = %message, "Error running job");
        policy.trigger(FailureRecord {
            index,
            job: job.name().to_string(),
            message,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "job panicked".to_string()
    }
}

#[cfg(test)]
#[path = "job_runner_tests.rs"]
mod job_runner_tests;
