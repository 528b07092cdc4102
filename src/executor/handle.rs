//! Per-job progress tracking

#![allow(clippy::must_use_candidate)]

use super::completion::Completion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Status of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum JobStatus {
    /// Submitted, waiting for a worker slot
    Pending = 0,
    /// A worker is executing the job body
    Running = 1,
    /// The body returned, successfully or not
    Completed = 2,
    /// Withdrawn before it started
    Cancelled = 3,
}

impl JobStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Completed,
            _ => Self::Cancelled,
        }
    }

    /// Returns true for COMPLETED and CANCELLED
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The runner's record of one job's progress.
///
/// Every transition is a compare-and-swap, so a handle is either started by
/// a worker or withdrawn by the fail-fast policy, never both. Reaching a
/// terminal status bumps the shared [`Completion`] exactly once.
#[derive(Debug)]
pub struct JobHandle {
    index: usize,
    name: String,
    status: AtomicU8,
    completion: Arc<Completion>,
}

impl JobHandle {
    /// Creates a PENDING handle reporting to `completion`
    pub fn new(index: usize, name: impl Into<String>, completion: Arc<Completion>) -> Self {
        Self {
            index,
            name: name.into(),
            status: AtomicU8::new(JobStatus::Pending as u8),
            completion,
        }
    }

    /// Position of the job in submission order
    pub fn index(&self) -> usize {
        self.index
    }

    /// Name of the job
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status; never blocks
    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Returns true once the handle is COMPLETED or CANCELLED
    pub fn is_settled(&self) -> bool {
        self.status().is_settled()
    }

    /// PENDING -> RUNNING. Returns false if the handle was withdrawn.
    pub fn begin(&self) -> bool {
        self.transition(JobStatus::Pending, JobStatus::Running)
    }

    /// RUNNING -> COMPLETED
    pub fn complete(&self) -> bool {
        let done = self.transition(JobStatus::Running, JobStatus::Completed);
        if done {
            self.completion.settle();
        }
        done
    }

    /// PENDING -> CANCELLED. Running and settled handles are left untouched.
    pub fn withdraw(&self) -> bool {
        let done = self.transition(JobStatus::Pending, JobStatus::Cancelled);
        if done {
            self.completion.settle();
        }
        done
    }

    fn transition(&self, from: JobStatus, to: JobStatus) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
