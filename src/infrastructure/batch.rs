//! Batch files describing synthetic jobs
//!
//! Used by the `jobrunner run` command to exercise the runner without
//! writing Rust:
//!
//! ```yaml
//! parallelism: 10
//! jobs:
//!   - name: fetch
//!     sleep_ms: 500
//!     repeat: 20
//!   - name: broken
//!     sleep_ms: 100
//!     fail: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::config::{ConfigError, read_file};
use crate::runner::{Job, JobResult, SharedJob};

/// A parsed batch file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFile {
    /// Parallelism requested by the batch, if any
    #[serde(default)]
    pub parallelism: Option<i64>,
    /// Job entries in submission order
    pub jobs: Vec<JobSpec>,
}

/// One entry of a batch file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Job name shown in diagnostics
    pub name: String,
    /// Time the job sleeps before returning
    #[serde(default)]
    pub sleep_ms: u64,
    /// Whether the job fails after sleeping
    #[serde(default)]
    pub fail: bool,
    /// Number of copies of this job to submit
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_repeat() -> usize {
    1
}

impl BatchFile {
    /// Parses and validates a batch from YAML
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed YAML and
    /// [`ConfigError::Invalid`] if an entry has an empty name or `repeat: 0`.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let batch: Self = serde_yaml::from_str(yaml)?;
        batch.validate()?;
        Ok(batch)
    }

    /// Reads a batch from a YAML file
    ///
    /// # Errors
    ///
    /// See [`BatchFile::from_yaml`]; also [`ConfigError::Read`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = read_file(path)?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (i, spec) in self.jobs.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("job #{i} has an empty name")));
            }
            if spec.repeat == 0 {
                return Err(ConfigError::Invalid(format!(
                    "job '{}' has repeat: 0",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Total number of jobs after expanding `repeat`
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.iter().map(|spec| spec.repeat).sum()
    }

    /// Expands the entries into runnable jobs, in order
    #[must_use]
    pub fn to_jobs(&self) -> Vec<SharedJob> {
        let mut jobs: Vec<SharedJob> = Vec::with_capacity(self.job_count());
        for spec in &self.jobs {
            for copy in 0..spec.repeat {
                let name = if spec.repeat == 1 {
                    spec.name.clone()
                } else {
                    format!("{}#{}", spec.name, copy + 1)
                };
                jobs.push(Arc::new(SleepJob {
                    name,
                    sleep: Duration::from_millis(spec.sleep_ms),
                    fail: spec.fail,
                }));
            }
        }
        jobs
    }
}

/// Sleeps, then succeeds or fails
#[derive(Debug, Clone)]
pub struct SleepJob {
    name: String,
    sleep: Duration,
    fail: bool,
}

impl SleepJob {
    /// Creates a sleep job
    #[must_use]
    pub fn new(name: impl Into<String>, sleep: Duration, fail: bool) -> Self {
        Self {
            name: name.into(),
            sleep,
            fail,
        }
    }
}

impl Job for SleepJob {
    fn execute(&self) -> JobResult {
        thread::sleep(self.sleep);
        if self.fail {
            return Err(format!("job '{}' failed as configured", self.name).into());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
