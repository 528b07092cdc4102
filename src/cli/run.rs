//! `jobrunner run` - Execute a batch file
//!
//! Loads a YAML batch, runs it through a [`JobRunner`] and renders the final
//! statistics.
//!
//! ## Usage
//!
//! ```bash
//! jobrunner run batch.yaml --parallelism 4 --format json
//! # Exit code 0: every job finished
//! # Exit code 1: a job failed and the batch was stopped
//! ```

use anyhow::{Context, Result};
use jobrunner::{BatchFile, Config, FailureRecord, JobRunner, RunnerError, RunnerStats};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Output format for the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable tally
    #[default]
    Text,
    /// JSON document
    Json,
}

/// Options of the `run` command
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Overrides the batch and config parallelism
    pub parallelism: Option<i64>,
    /// Report format
    pub format: OutputFormat,
}

/// What a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Identifier of the run, also attached to its log lines
    pub run_id: Uuid,
    /// Settle-time statistics
    pub stats: RunnerStats,
    /// Captured job failures
    pub failures: Vec<FailureRecord>,
}

impl RunReport {
    /// Returns true if the batch ended in FINISHED
    pub fn succeeded(&self) -> bool {
        self.stats.state == jobrunner::RunnerState::Finished
    }
}

/// Runs the batch in `file`.
///
/// Parallelism precedence: command line, then batch file, then config.
pub fn run_batch(file: &Path, run: &RunConfig, config: &Config) -> Result<RunReport> {
    let batch = BatchFile::from_file(file)
        .with_context(|| format!("Failed to load batch: {}", file.display()))?;

    let parallelism = run
        .parallelism
        .or(batch.parallelism)
        .unwrap_or(config.parallelism);

    tracing::debug!(
        batch = %file.display(),
        jobs = batch.job_count(),
        parallelism,
        "Running batch"
    );

    let mut runner = JobRunner::new(batch.to_jobs(), parallelism);
    match runner.start() {
        Ok(()) | Err(RunnerError::RunnerFailed) => {}
        Err(e) => {
            return Err(e).with_context(|| format!("Batch {} could not run", file.display()));
        }
    }

    Ok(RunReport {
        run_id: runner.run_id(),
        stats: runner.stats(),
        failures: runner.failures(),
    })
}

/// Renders a report in the requested format
pub fn format_report(report: &RunReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize report")
        }
        OutputFormat::Text => {
            let mut output = report.stats.to_string();
            for failure in &report.failures {
                output.push_str(&format!(
                    "\nJob #{} ({}) failed: {}",
                    failure.index, failure.job, failure.message
                ));
            }
            Ok(output)
        }
    }
}
