//! Settle-time statistics

use super::state::RunnerState;
use crate::executor::{JobHandle, JobStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Counters derived from the job handles once a run has settled.
///
/// `finished` is always `added - running - cancelled`. Because running jobs
/// are never preempted, `finished` is a best-effort count when a failure
/// races with siblings that had already started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunnerStats {
    /// Runner state the counters were taken in
    pub state: RunnerState,
    /// Jobs submitted to the pool
    pub added: usize,
    /// Jobs not yet settled
    pub running: usize,
    /// Jobs withdrawn before they started
    pub cancelled: usize,
    /// Jobs whose body returned
    pub finished: usize,
    /// Wall-clock duration of the run in milliseconds
    pub elapsed_ms: u64,
}

impl RunnerStats {
    /// Derives the counters from `handles`
    #[must_use]
    pub fn from_handles(state: RunnerState, handles: &[Arc<JobHandle>], elapsed: Duration) -> Self {
        // One read per handle so the counters agree with each other.
        let statuses: Vec<JobStatus> = handles.iter().map(|h| h.status()).collect();
        let added = statuses.len();
        let running = statuses.iter().filter(|s| !s.is_settled()).count();
        let cancelled = statuses
            .iter()
            .filter(|s| **s == JobStatus::Cancelled)
            .count();

        Self {
            state,
            added,
            running,
            cancelled,
            finished: added - running - cancelled,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns a copy tagged with `state`
    #[must_use]
    pub fn with_state(self, state: RunnerState) -> Self {
        Self { state, ..self }
    }

    /// Returns true if any job was withdrawn
    #[must_use]
    pub fn has_cancellations(&self) -> bool {
        self.cancelled > 0
    }
}

impl fmt::Display for RunnerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "JobRunner status {}.", self.state)?;
        writeln!(f, "{} total added jobs.", self.added)?;
        writeln!(f, "{} running jobs.", self.running)?;
        writeln!(f, "{} cancelled jobs.", self.cancelled)?;
        write!(f, "{} finished jobs.", self.finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Completion;
    use pretty_assertions::assert_eq;

    fn handles(n: usize) -> Vec<Arc<JobHandle>> {
        let completion = Arc::new(Completion::new());
        (0..n)
            .map(|i| Arc::new(JobHandle::new(i, "job", Arc::clone(&completion))))
            .collect()
    }

    #[test]
    fn test_counts_by_status() {
        let handles = handles(5);
        handles[0].begin();
        handles[0].complete();
        handles[1].begin();
        handles[1].complete();
        handles[2].begin();
        handles[3].withdraw();

        let stats = RunnerStats::from_handles(RunnerState::Started, &handles, Duration::ZERO);
        assert_eq!(
            stats,
            RunnerStats {
                state: RunnerState::Started,
                added: 5,
                running: 2,
                cancelled: 1,
                finished: 2,
                elapsed_ms: 0,
            }
        );
        assert!(stats.has_cancellations());
    }

    #[test]
    fn test_empty_handles() {
        let stats = RunnerStats::from_handles(RunnerState::Started, &[], Duration::from_millis(5));
        assert_eq!(stats.added, 0);
        assert_eq!(stats.finished, 0);
        assert_eq!(stats.elapsed_ms, 5);
    }

    #[test]
    fn test_display_tally() {
        let stats = RunnerStats {
            state: RunnerState::Finished,
            added: 3,
            running: 0,
            cancelled: 0,
            finished: 3,
            elapsed_ms: 12,
        };
        assert_eq!(
            stats.to_string(),
            "JobRunner status FINISHED.\n3 total added jobs.\n0 running jobs.\n0 cancelled jobs.\n3 finished jobs."
        );
    }

    #[test]
    fn test_serialize_json() {
        let stats = RunnerStats::default().with_state(RunnerState::Error);
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["state"], "ERROR");
        assert_eq!(json["cancelled"], 0);
    }
}
