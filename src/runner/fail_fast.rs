//! Fail-fast policy
//!
//! The first job failure shuts the pool down and withdraws every handle that
//! has not started yet. Jobs already running are not interrupted, so siblings
//! that began before the withdrawal still run to completion. That race is
//! inherent to cooperative cancellation; callers can only rely on upper
//! bounds for `finished`.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::executor::{JobHandle, PoolControl};

/// A job body failure captured by the runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Submission index of the failing job
    pub index: usize,
    /// Name of the failing job
    pub job: String,
    /// Rendered failure message
    pub message: String,
}

/// Shared between the runner and every wrapped task
#[derive(Debug)]
pub(crate) struct FailFast {
    control: PoolControl,
    handles: RwLock<Vec<Arc<JobHandle>>>,
    failures: Mutex<Vec<FailureRecord>>,
}

impl FailFast {
    pub(crate) fn new(control: PoolControl) -> Self {
        Self {
            control,
            handles: RwLock::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Registers a handle. Must happen before the job is submitted so a
    /// concurrent trigger can see it.
    pub(crate) fn track(&self, handle: Arc<JobHandle>) {
        self.handles.write().push(handle);
    }

    /// Records a failure and, on the first call only, stops the pool and
    /// withdraws pending handles. Returns true for the call that stopped it.
    pub(crate) fn trigger(&self, record: FailureRecord) -> bool {
        self.failures.lock().push(record);

        // Pending handles are withdrawn before completion waiters wake.
        let mut withdrawn = 0;
        let stopped = self.control.shutdown_with(|| {
            withdrawn = self
                .handles
                .read()
                .iter()
                .filter(|handle| handle.withdraw())
                .count();
        });
        if !stopped {
            return false;
        }

        error!(
            withdrawn,
            "Stopping Job Runner due to error in one of the jobs; please verify logs before running again"
        );
        true
    }

    pub(crate) fn is_triggered(&self) -> bool {
        self.control.is_shutdown()
    }

    pub(crate) fn handles(&self) -> Vec<Arc<JobHandle>> {
        self.handles.read().clone()
    }

    pub(crate) fn failures(&self) -> Vec<FailureRecord> {
        self.failures.lock().clone()
    }
}
