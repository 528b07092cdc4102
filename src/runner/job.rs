//! The unit of work executed by the runner

use super::errors::JobResult;
use std::fmt;
use std::sync::Arc;

/// A single unit of work with no return value.
///
/// Jobs run in parallel on the runner's worker threads, so implementations
/// must be thread-safe. Returning `Err` (or panicking) counts as a failure
/// and triggers the runner's fail-fast policy.
pub trait Job: Send + Sync {
    /// Runs the job body
    #[allow(clippy::missing_errors_doc)]
    fn execute(&self) -> JobResult;

    /// Human-readable name used in diagnostics
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared, type-erased job as stored by the runner
pub type SharedJob = Arc<dyn Job>;

impl<F> Job for F
where
    F: Fn() -> JobResult + Send + Sync,
{
    fn execute(&self) -> JobResult {
        self()
    }
}

/// A closure job carrying an explicit name
pub struct NamedJob<F> {
    name: String,
    body: F,
}

impl<F> NamedJob<F>
where
    F: Fn() -> JobResult + Send + Sync,
{
    /// Creates a named job from a closure
    #[must_use]
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }
}

impl<F> Job for NamedJob<F>
where
    F: Fn() -> JobResult + Send + Sync,
{
    fn execute(&self) -> JobResult {
        (self.body)()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for NamedJob<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedJob").field("name", &self.name).finish()
    }
}

/// Wraps a job into a [`SharedJob`]
pub fn shared<J: Job + 'static>(job: J) -> SharedJob {
    Arc::new(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_job() {
        let job = || -> JobResult { Ok(()) };
        assert!(job.execute().is_ok());
    }

    #[test]
    fn test_closure_failure() {
        let job = || -> JobResult { Err("Ups!".into()) };
        let err = job.execute().unwrap_err();
        assert_eq!(err.to_string(), "Ups!");
    }

    #[test]
    fn test_named_job() {
        let job = NamedJob::new("fetch", || Ok(()));
        assert_eq!(job.name(), "fetch");
        assert!(job.execute().is_ok());
    }

    #[test]
    fn test_shared_job_keeps_name() {
        let job = shared(NamedJob::new("index", || Ok(())));
        assert_eq!(job.name(), "index");
    }
}
